//! A schema-validated document mapping layer that sits between application code
//! and a pluggable document-store adapter.
//!
//! This crate is the core of the recordlayer project and provides:
//!
//! - **Mapper schemas** ([`mapper`]) - Declarative, data-driven collection schemas
//! - **Schema validation** ([`validate`]) - Type, required-field and length checks
//! - **Relation resolution** ([`relation`]) - Cross-collection reference verification
//! - **Query and filtering API** ([`query`]) - Tagged filter AST with options shorthand
//! - **Records** ([`record`]) - Identity-and-revision-bearing document snapshots
//! - **The container** ([`container`]) - Lifecycle-managed CRUD façade
//! - **Adapter abstraction** ([`adapter`]) - The narrow storage interface consumed
//! - **Error handling** ([`error`]) - Distinct, inspectable error kinds
//!
//! # Example
//!
//! ```ignore
//! use recordlayer_core::{container::Container, mapper::{Mapper, FieldSpec}};
//! use bson::doc;
//!
//! let container = Container::builder(adapter)
//!     .mapper(
//!         "people",
//!         Mapper::builder()
//!             .field("firstName", FieldSpec::string().min_length(1))
//!             .field("lastName", FieldSpec::string().min_length(1))
//!             .required(["firstName", "lastName"])
//!             .build(),
//!     )
//!     .build();
//!
//! container.load().await?;
//! let record = container
//!     .insert("people", doc! { "firstName": "John", "lastName": "Doe" })
//!     .await?;
//! assert!(!record.id().is_empty());
//! ```

#[allow(unused_extern_crates)]
extern crate self as recordlayer_core;

pub mod adapter;
pub mod container;
pub mod error;
pub mod mapper;
pub mod query;
pub mod record;
pub mod relation;
pub mod validate;
