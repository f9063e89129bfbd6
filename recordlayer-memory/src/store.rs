//! In-memory adapter implementation.
//!
//! Documents live in nested maps behind an async-aware read-write lock:
//! database name → collection name → document id → document. The adapter is
//! cloneable; clones share the same underlying state.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use recordlayer_core::{
    adapter::Adapter,
    error::{AdapterError, AdapterResult},
    mapper::is_reserved_field,
    query::Query,
};

use crate::evaluator::DocumentEvaluator;

/// Documents keyed by id. A BTreeMap keeps iteration order stable across
/// calls, though callers must not rely on any particular order.
type CollectionMap = BTreeMap<String, Document>;
type DatabaseMap = HashMap<String, CollectionMap>;
type StoreMap = HashMap<String, DatabaseMap>;

/// Thread-safe in-memory storage adapter.
///
/// Implements the full [`Adapter`] contract including id/revision assignment
/// and all-or-nothing bulk inserts. Queries scan the whole collection (no
/// indexing), which is fine for the small datasets this adapter targets.
///
/// # Example
///
/// ```ignore
/// use recordlayer_memory::MemoryAdapter;
/// use bson::doc;
///
/// let adapter = MemoryAdapter::new("app");
/// adapter.create_database().await?;
/// adapter.ensure_collection("people").await?;
///
/// let stored = adapter
///     .insert("people", None, doc! { "firstName": "John" })
///     .await?;
/// assert!(stored.get_str("id").is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct MemoryAdapter {
    name: String,
    databases: Arc<RwLock<StoreMap>>,
}

impl MemoryAdapter {
    /// Creates an adapter operating on the named database.
    ///
    /// The database itself is not created until
    /// [`create_database`](Adapter::create_database) is called.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            databases: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing a `MemoryAdapter`.
    pub fn builder() -> MemoryAdapterBuilder {
        MemoryAdapterBuilder::default()
    }

    /// Returns a clone of this adapter bound to a different database name,
    /// sharing the same underlying storage.
    pub fn with_database(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            databases: Arc::clone(&self.databases),
        }
    }

    fn generate_token() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

fn stored_form(id: String, mut document: Document) -> Document {
    document.insert("id", Bson::String(id));
    document.insert("rev", Bson::String(MemoryAdapter::generate_token()));
    document
}

fn project(mut document: Document, fields: &[String]) -> Document {
    let keep: Vec<String> = document
        .keys()
        .filter(|key| is_reserved_field(key) || fields.iter().any(|field| field == *key))
        .cloned()
        .collect();

    let mut projected = Document::new();
    for key in keep {
        if let Some(value) = document.remove(&key) {
            projected.insert(key, value);
        }
    }

    projected
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn database_names(&self) -> AdapterResult<Vec<String>> {
        Ok(self
            .databases
            .read()
            .await
            .keys()
            .cloned()
            .collect())
    }

    async fn create_database(&self) -> AdapterResult<()> {
        let mut databases = self.databases.write().await;

        if databases.contains_key(&self.name) {
            return Err(AdapterError::Backend(format!(
                "database {} already exists",
                self.name
            )));
        }

        databases.insert(self.name.clone(), DatabaseMap::new());
        Ok(())
    }

    async fn drop_database(&self) -> AdapterResult<()> {
        let mut databases = self.databases.write().await;

        if databases.remove(&self.name).is_none() {
            return Err(AdapterError::Backend(format!(
                "database {} does not exist",
                self.name
            )));
        }

        Ok(())
    }

    async fn ensure_collection(&self, name: &str) -> AdapterResult<()> {
        let mut databases = self.databases.write().await;
        let database = databases
            .get_mut(&self.name)
            .ok_or_else(|| {
                AdapterError::Connection(format!("database {} does not exist", self.name))
            })?;

        database
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        id: Option<String>,
        document: Document,
    ) -> AdapterResult<Document> {
        let mut databases = self.databases.write().await;
        let database = databases
            .get_mut(&self.name)
            .ok_or_else(|| {
                AdapterError::Connection(format!("database {} does not exist", self.name))
            })?;
        let collection_map = database
            .entry(collection.to_string())
            .or_default();

        let id = id.unwrap_or_else(Self::generate_token);

        if collection_map.contains_key(&id) {
            return Err(AdapterError::Conflict {
                id,
                collection: collection.to_string(),
            });
        }

        let stored = stored_form(id.clone(), document);
        collection_map.insert(id, stored.clone());

        Ok(stored)
    }

    async fn bulk_insert(
        &self,
        collection: &str,
        documents: Vec<(Option<String>, Document)>,
    ) -> AdapterResult<Vec<Document>> {
        let mut databases = self.databases.write().await;
        let database = databases
            .get_mut(&self.name)
            .ok_or_else(|| {
                AdapterError::Connection(format!("database {} does not exist", self.name))
            })?;
        let collection_map = database
            .entry(collection.to_string())
            .or_default();

        // Assign ids and verify the whole batch before touching the map, so a
        // collision anywhere commits nothing.
        let mut batch = Vec::with_capacity(documents.len());
        let mut claimed = HashSet::new();

        for (id, document) in documents {
            let id = id.unwrap_or_else(Self::generate_token);

            if collection_map.contains_key(&id) || !claimed.insert(id.clone()) {
                return Err(AdapterError::Conflict {
                    id,
                    collection: collection.to_string(),
                });
            }

            batch.push((id, document));
        }

        let mut stored_documents = Vec::with_capacity(batch.len());
        for (id, document) in batch {
            let stored = stored_form(id.clone(), document);
            collection_map.insert(id, stored.clone());
            stored_documents.push(stored);
        }

        Ok(stored_documents)
    }

    async fn find(&self, collection: &str, query: Query) -> AdapterResult<Vec<Document>> {
        let databases = self.databases.read().await;
        let collection_map = match databases
            .get(&self.name)
            .and_then(|database| database.get(collection))
        {
            Some(map) => map,
            None => return Ok(vec![]),
        };

        let matched = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.values(), filter)
                .map_err(|err| AdapterError::Backend(err.to_string()))?,
            None => collection_map.values().cloned().collect(),
        };

        Ok(matched
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|document| match &query.projection {
                Some(fields) => project(document, fields),
                None => document,
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> AdapterResult<Document> {
        self.databases
            .read()
            .await
            .get(&self.name)
            .and_then(|database| database.get(collection))
            .and_then(|collection_map| collection_map.get(id))
            .cloned()
            .ok_or_else(|| AdapterError::NotFound {
                id: id.to_string(),
                collection: collection.to_string(),
            })
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> AdapterResult<Document> {
        let mut databases = self.databases.write().await;
        let collection_map = databases
            .get_mut(&self.name)
            .and_then(|database| database.get_mut(collection))
            .ok_or_else(|| AdapterError::NotFound {
                id: id.to_string(),
                collection: collection.to_string(),
            })?;

        if !collection_map.contains_key(id) {
            return Err(AdapterError::NotFound {
                id: id.to_string(),
                collection: collection.to_string(),
            });
        }

        let stored = stored_form(id.to_string(), document);
        collection_map.insert(id.to_string(), stored.clone());

        Ok(stored)
    }

    async fn remove(&self, collection: &str, id: &str) -> AdapterResult<()> {
        let mut databases = self.databases.write().await;
        let collection_map = databases
            .get_mut(&self.name)
            .and_then(|database| database.get_mut(collection))
            .ok_or_else(|| AdapterError::NotFound {
                id: id.to_string(),
                collection: collection.to_string(),
            })?;

        if collection_map.remove(id).is_none() {
            return Err(AdapterError::NotFound {
                id: id.to_string(),
                collection: collection.to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing [`MemoryAdapter`] instances.
#[derive(Debug, Default)]
pub struct MemoryAdapterBuilder {
    name: Option<String>,
}

impl MemoryAdapterBuilder {
    /// Sets the database name the adapter operates on.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds and returns the adapter.
    pub fn build(self) -> MemoryAdapter {
        MemoryAdapter::new(self.name.unwrap_or_else(|| "default".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use recordlayer_core::query::{Filter, Query};

    async fn adapter() -> MemoryAdapter {
        let adapter = MemoryAdapter::new("test");
        adapter.create_database().await.unwrap();
        adapter
            .ensure_collection("people")
            .await
            .unwrap();
        adapter
    }

    #[tokio::test]
    async fn insert_assigns_id_and_rev() {
        let adapter = adapter().await;

        let stored = adapter
            .insert("people", None, doc! { "firstName": "John" })
            .await
            .unwrap();

        assert!(!stored.get_str("id").unwrap().is_empty());
        assert!(!stored.get_str("rev").unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_honors_explicit_id_and_detects_conflicts() {
        let adapter = adapter().await;

        let stored = adapter
            .insert("people", Some("p1".to_string()), doc! { "firstName": "John" })
            .await
            .unwrap();
        assert_eq!(stored.get_str("id").unwrap(), "p1");

        let err = adapter
            .insert("people", Some("p1".to_string()), doc! { "firstName": "Jane" })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Conflict { id, .. } if id == "p1"));
    }

    #[tokio::test]
    async fn bulk_insert_commits_nothing_on_collision() {
        let adapter = adapter().await;
        adapter
            .insert("people", Some("p1".to_string()), doc! { "firstName": "John" })
            .await
            .unwrap();

        let err = adapter
            .bulk_insert(
                "people",
                vec![
                    (None, doc! { "firstName": "Jennifer" }),
                    (Some("p1".to_string()), doc! { "firstName": "Bob" }),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Conflict { .. }));

        let all = adapter
            .find("people", Query::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn find_applies_filter_then_skip_then_limit() {
        let adapter = adapter().await;
        adapter
            .bulk_insert(
                "people",
                vec![
                    (Some("a".to_string()), doc! { "n": 1 }),
                    (Some("b".to_string()), doc! { "n": 2 }),
                    (Some("c".to_string()), doc! { "n": 3 }),
                ],
            )
            .await
            .unwrap();

        let matched = adapter
            .find(
                "people",
                Query::builder()
                    .filter(Filter::gt("n", 1))
                    .skip(1)
                    .limit(1)
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].get_str("id").unwrap(), "c");
    }

    #[tokio::test]
    async fn projection_keeps_named_and_reserved_fields() {
        let adapter = adapter().await;
        adapter
            .insert(
                "people",
                Some("p1".to_string()),
                doc! { "firstName": "John", "lastName": "Doe" },
            )
            .await
            .unwrap();

        let matched = adapter
            .find(
                "people",
                Query::builder()
                    .project(["firstName"])
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(matched[0].get_str("firstName").unwrap(), "John");
        assert_eq!(matched[0].get_str("id").unwrap(), "p1");
        assert!(matched[0].get("lastName").is_none());
    }

    #[tokio::test]
    async fn replace_changes_rev_and_keeps_id() {
        let adapter = adapter().await;
        let stored = adapter
            .insert("people", Some("p1".to_string()), doc! { "firstName": "John" })
            .await
            .unwrap();

        let replaced = adapter
            .replace("people", "p1", doc! { "firstName": "Rebecca" })
            .await
            .unwrap();

        assert_eq!(replaced.get_str("id").unwrap(), "p1");
        assert_ne!(
            replaced.get_str("rev").unwrap(),
            stored.get_str("rev").unwrap()
        );

        let err = adapter
            .replace("people", "missing", doc! { "firstName": "X" })
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn remove_is_not_idempotent() {
        let adapter = adapter().await;
        adapter
            .insert("people", Some("p1".to_string()), doc! { "firstName": "John" })
            .await
            .unwrap();

        adapter.remove("people", "p1").await.unwrap();

        let err = adapter.remove("people", "p1").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn database_lifecycle() {
        let adapter = MemoryAdapter::new("test");
        assert!(adapter
            .database_names()
            .await
            .unwrap()
            .is_empty());

        adapter.create_database().await.unwrap();
        assert_eq!(
            adapter.database_names().await.unwrap(),
            vec!["test".to_string()]
        );
        assert!(adapter.create_database().await.is_err());

        adapter.drop_database().await.unwrap();
        assert!(adapter.drop_database().await.is_err());
    }
}
