//! Main recordlayer crate providing a schema-validated document mapping layer.
//!
//! This crate is the primary entry point for users of the recordlayer
//! framework. It re-exports the core engine and the in-memory adapter, and
//! provides a [`prelude`] for convenient imports.
//!
//! # Features
//!
//! - **Declarative schemas** - Mappers are data: fields, required sets and
//!   an additional-properties policy, interpreted by one generic validator
//! - **Referential checks** - Array-of-identifier fields are verified against
//!   their target collections before any write commits
//! - **Lifecycle management** - An explicit load handshake with the adapter,
//!   idempotent once loaded, plus pre-insert/pre-update hook slots
//! - **Pluggable storage** - The container consumes a narrow async adapter
//!   trait; backends own their connection management and consistency
//!
//! # Quick Start
//!
//! ```ignore
//! use recordlayer::{prelude::*, memory::MemoryAdapter};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ContainerError> {
//!     let container = Container::builder(MemoryAdapter::new("app"))
//!         .mapper(
//!             "people",
//!             Mapper::builder()
//!                 .field("firstName", FieldSpec::string().min_length(1))
//!                 .field("lastName", FieldSpec::string().min_length(1))
//!                 .required(["firstName", "lastName"])
//!                 .additional_properties(false)
//!                 .build(),
//!         )
//!         .before_insert(|record| {
//!             record.insert("createdAt", bson::DateTime::now());
//!         })
//!         .build();
//!
//!     container.load().await?;
//!
//!     let record = container
//!         .insert("people", doc! { "firstName": "John", "lastName": "Doe" })
//!         .await?;
//!
//!     let found = container
//!         .find_all("people", doc! { "$where": { "lastName": { "$eq": "Doe" } } })
//!         .await?;
//!     assert_eq!(found.len(), 1);
//!
//!     container.remove("people", &record).await?;
//!     Ok(())
//! }
//! ```

pub use recordlayer_core::{adapter, container, error, mapper, query, record, relation, validate};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage adapter implementations.
pub mod memory {
    pub use recordlayer_memory::{MemoryAdapter, MemoryAdapterBuilder};
}

pub mod prelude;
