//! Error types and result types for container operations.
//!
//! This module provides comprehensive error handling for all mapping-layer operations.
//! Use [`ContainerResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors surfaced by a [`Container`](crate::container::Container).
///
/// This enum covers lifecycle failures, schema and relation violations,
/// document conflicts, and wrapped adapter errors. Every failure is a distinct,
/// inspectable kind; the container never retries silently and never commits
/// a partial write.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// An operation was attempted before `load()` completed successfully.
    #[error("container is not loaded")]
    NotLoaded,
    /// Setup or connection failure during `load()`. Recoverable by retrying `load()`.
    #[error("load failed: {0}")]
    Load(String),
    /// The candidate data violates the collection's mapper schema.
    #[error("invalid value for field {field}: {reason}")]
    Validation {
        /// The offending field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A declared relationship references a record that does not exist.
    ///
    /// The display form is pinned: callers match on the
    /// `should be an existing` prefix.
    #[error("should be an existing {mapper} record (field {field})")]
    Relation {
        /// The mapper the missing record was expected in.
        mapper: String,
        /// The relationship field holding the dangling identifier.
        field: String,
    },
    /// An insert collided with an existing identifier.
    /// The first argument is the document id, the second is the collection name.
    #[error("document {0} already exists in collection {1}")]
    AlreadyExists(String, String),
    /// A get/replace/remove targeted a nonexistent document.
    /// The first argument is the document id, the second is the collection name.
    #[error("document {0} not found in collection {1}")]
    NotFound(String, String),
    /// An operation named a collection with no registered mapper.
    #[error("no mapper registered for collection {0}")]
    UnknownMapper(String),
    /// A query shorthand could not be normalized into a [`Query`](crate::query::Query).
    #[error("invalid query: {0}")]
    Query(String),
    /// Serialization/deserialization error when converting document values.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// An adapter failure with no more precise container-level kind.
    #[error("adapter error: {0}")]
    Adapter(String),
}

/// A specialized `Result` type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Adapter-native failure signals, translated by the container into
/// [`ContainerError`] kinds before they reach the caller.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The requested document was not found in the collection.
    #[error("document {id} not found in collection {collection}")]
    NotFound {
        /// The missing document id.
        id: String,
        /// The collection searched.
        collection: String,
    },
    /// A write collided with an existing document id.
    #[error("document {id} already exists in collection {collection}")]
    Conflict {
        /// The colliding document id.
        id: String,
        /// The collection written to.
        collection: String,
    },
    /// The storage backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<AdapterError> for ContainerError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotFound { id, collection } => ContainerError::NotFound(id, collection),
            AdapterError::Conflict { id, collection } => {
                ContainerError::AlreadyExists(id, collection)
            }
            AdapterError::Connection(msg) => ContainerError::Adapter(msg),
            AdapterError::Backend(msg) => ContainerError::Adapter(msg),
        }
    }
}

impl From<BsonError> for ContainerError {
    fn from(err: BsonError) -> Self {
        ContainerError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for ContainerError {
    fn from(err: SerdeJsonError) -> Self {
        ContainerError::Serialization(err.to_string())
    }
}
