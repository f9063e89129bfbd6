//! Storage adapter abstraction consumed by the container.
//!
//! The [`Adapter`] trait is the narrow seam between the mapping layer and a
//! concrete document store. Adapters own connection management, raw CRUD and
//! database creation; they signal outcomes with [`AdapterError`] kinds that
//! the container translates into its own error taxonomy. Adapters are
//! responsible for their own consistency guarantees; the container holds no
//! lock around adapter calls.
//!
//! Stored documents leave the adapter carrying `id` and `rev` fields; `rev`
//! must change on every successful mutation.

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::{error::AdapterResult, query::Query};

/// Abstract interface over a document store backend.
///
/// All methods are async and must be safe to call concurrently from multiple
/// tasks. Implementations decide their own concurrency model; the in-memory
/// adapter, for example, serializes writes behind an async read-write lock.
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// The name of the database this adapter operates on.
    fn database_name(&self) -> &str;

    /// Lists the names of the databases visible to this adapter.
    async fn database_names(&self) -> AdapterResult<Vec<String>>;

    /// Creates the adapter's database. Fails if it already exists.
    async fn create_database(&self) -> AdapterResult<()>;

    /// Drops the adapter's database and everything in it.
    async fn drop_database(&self) -> AdapterResult<()>;

    /// Ensures a collection exists, creating it if necessary. Idempotent.
    async fn ensure_collection(&self, name: &str) -> AdapterResult<()>;

    /// Persists a new document.
    ///
    /// When `id` is `None` the adapter assigns one. The returned document is
    /// the stored form, carrying `id` and a fresh `rev`.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Conflict`](crate::error::AdapterError::Conflict) if a
    /// document with the same id already exists.
    async fn insert(
        &self,
        collection: &str,
        id: Option<String>,
        document: Document,
    ) -> AdapterResult<Document>;

    /// Persists a batch of new documents, all or nothing.
    ///
    /// A single id collision fails the whole batch and commits none of it.
    /// Returns the stored documents in input order.
    async fn bulk_insert(
        &self,
        collection: &str,
        documents: Vec<(Option<String>, Document)>,
    ) -> AdapterResult<Vec<Document>>;

    /// Returns the documents matching `query`, applying the filter, then
    /// skip, then limit, in adapter-determined order.
    async fn find(&self, collection: &str, query: Query) -> AdapterResult<Vec<Document>>;

    /// Retrieves a single document by id.
    ///
    /// # Errors
    ///
    /// [`AdapterError::NotFound`](crate::error::AdapterError::NotFound) if no
    /// document with that id exists.
    async fn get(&self, collection: &str, id: &str) -> AdapterResult<Document>;

    /// Replaces an existing document entirely, keeping its id and assigning a
    /// fresh `rev` distinct from the prior one.
    ///
    /// # Errors
    ///
    /// [`AdapterError::NotFound`](crate::error::AdapterError::NotFound) if no
    /// document with that id exists.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> AdapterResult<Document>;

    /// Removes a document by id.
    ///
    /// Removal is not idempotent: removing an id that does not exist
    /// (including an id already removed) fails with
    /// [`AdapterError::NotFound`](crate::error::AdapterError::NotFound).
    async fn remove(&self, collection: &str, id: &str) -> AdapterResult<()>;
}

#[async_trait]
impl<A> Adapter for &A
where
    A: Adapter,
{
    fn database_name(&self) -> &str {
        (*self).database_name()
    }

    async fn database_names(&self) -> AdapterResult<Vec<String>> {
        (*self).database_names().await
    }

    async fn create_database(&self) -> AdapterResult<()> {
        (*self).create_database().await
    }

    async fn drop_database(&self) -> AdapterResult<()> {
        (*self).drop_database().await
    }

    async fn ensure_collection(&self, name: &str) -> AdapterResult<()> {
        (*self).ensure_collection(name).await
    }

    async fn insert(
        &self,
        collection: &str,
        id: Option<String>,
        document: Document,
    ) -> AdapterResult<Document> {
        (*self)
            .insert(collection, id, document)
            .await
    }

    async fn bulk_insert(
        &self,
        collection: &str,
        documents: Vec<(Option<String>, Document)>,
    ) -> AdapterResult<Vec<Document>> {
        (*self)
            .bulk_insert(collection, documents)
            .await
    }

    async fn find(&self, collection: &str, query: Query) -> AdapterResult<Vec<Document>> {
        (*self).find(collection, query).await
    }

    async fn get(&self, collection: &str, id: &str) -> AdapterResult<Document> {
        (*self).get(collection, id).await
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> AdapterResult<Document> {
        (*self)
            .replace(collection, id, document)
            .await
    }

    async fn remove(&self, collection: &str, id: &str) -> AdapterResult<()> {
        (*self).remove(collection, id).await
    }
}
