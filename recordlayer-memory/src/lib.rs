//! In-memory storage adapter for recordlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `Adapter` trait. It uses async-aware read-write locks for concurrent
//! access and is ideal for development, testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Identifier management** - Generates ids and revision tokens on write
//! - **Full query support** - Filtering, skip/limit pagination and projections
//! - **All-or-nothing batches** - Bulk inserts commit nothing on any collision
//!
//! # Quick Start
//!
//! ```ignore
//! use recordlayer_core::container::Container;
//! use recordlayer_memory::MemoryAdapter;
//! use bson::doc;
//!
//! let adapter = MemoryAdapter::new("app");
//! let container = Container::builder(adapter)
//!     .mapper("people", people_mapper())
//!     .build();
//!
//! container.load().await?;
//! container.insert("people", doc! { "firstName": "John", "lastName": "Doe" }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_memory;

pub mod evaluator;
pub mod store;

pub use store::{MemoryAdapter, MemoryAdapterBuilder};
