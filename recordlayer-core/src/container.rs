//! The container: mapping, validation and lifecycle façade over an adapter.
//!
//! A [`Container`] owns its adapter value, an immutable mapper registry and
//! optional lifecycle hooks. Every operation composes the same pipeline:
//! schema validation, relation resolution, hook invocation, adapter call,
//! record construction, in that order. No write is issued if any earlier
//! step fails.
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
//!             .additional_properties(false)
//!             .build(),
//!     )
//!     .before_insert(|record| {
//!         record.insert("createdAt", bson::DateTime::now());
//!     })
//!     .build();
//!
//! container.load().await?;
//! let record = container.insert("people", doc! { "firstName": "John", "lastName": "Doe" }).await?;
//! ```

use bson::{Bson, Document};
use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{
    adapter::Adapter,
    error::{ContainerError, ContainerResult},
    mapper::Mapper,
    query::Query,
    record::{AsRecordId, Record},
    relation,
    validate::validate,
};

/// Lifecycle hook invoked with the candidate document before a write.
///
/// Hooks mutate the document in place (stamping timestamps is the typical
/// use) and run synchronously before the adapter call.
pub type Hook = Box<dyn Fn(&mut Document) + Send + Sync>;

/// Schema-validating, relation-checking document mapping layer over a
/// storage adapter.
///
/// Each container instance owns its own mapper registry and hook set; two
/// containers over different adapters are fully independent. Records returned
/// from operations are snapshots; the container does not track them.
pub struct Container<A: Adapter> {
    adapter: A,
    mappers: HashMap<String, Mapper>,
    before_insert: Option<Hook>,
    before_update: Option<Hook>,
    loaded: AtomicBool,
    loading: AtomicBool,
}

impl<A: Adapter> Container<A> {
    /// Creates a builder for a container over the given adapter.
    pub fn builder(adapter: A) -> ContainerBuilder<A> {
        ContainerBuilder {
            adapter,
            mappers: HashMap::new(),
            before_insert: None,
            before_update: None,
        }
    }

    /// True once `load()` has completed successfully. Never transitions back.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// True only while the load handshake with the adapter is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Borrows the underlying adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Names of the collections with a registered mapper.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }

    /// Performs one-time setup with the adapter: ensures the database exists
    /// and a collection is present for every registered mapper.
    ///
    /// Idempotent once loaded: a second call resolves immediately without
    /// re-running setup. On failure the container stays unloaded so the call
    /// can be retried.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Load`] if the adapter cannot be reached or setup
    /// fails.
    pub async fn load(&self) -> ContainerResult<()> {
        if self.is_loaded() {
            return Ok(());
        }

        self.loading.store(true, Ordering::SeqCst);
        let setup = self.run_setup().await;
        self.loading.store(false, Ordering::SeqCst);

        match setup {
            Ok(()) => {
                self.loaded.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => Err(ContainerError::Load(err.to_string())),
        }
    }

    async fn run_setup(&self) -> ContainerResult<()> {
        let names = self.adapter.database_names().await?;

        if !names
            .iter()
            .any(|name| name == self.adapter.database_name())
        {
            self.adapter.create_database().await?;
        }

        for collection in self.mappers.keys() {
            self.adapter
                .ensure_collection(collection)
                .await?;
        }

        Ok(())
    }

    /// Validates `data` against the collection's mapper, resolves declared
    /// relations, runs the `before_insert` hook and persists the document.
    ///
    /// `data` may carry a caller-supplied `id`; otherwise the adapter assigns
    /// one.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Validation`], [`ContainerError::Relation`],
    /// [`ContainerError::AlreadyExists`] on id collision, or
    /// [`ContainerError::NotLoaded`] before `load()`.
    pub async fn insert(&self, collection: &str, data: Document) -> ContainerResult<Record> {
        self.ensure_loaded()?;
        let (id, data) = self.prepare_insert(collection, data).await?;

        let stored = self.adapter.insert(collection, id, data).await?;

        Record::from_stored(collection, stored)
    }

    /// Inserts a batch of documents, all or nothing.
    ///
    /// Each item is independently validated and relation-checked before any
    /// write is issued; a single id collision fails the whole call with
    /// [`ContainerError::AlreadyExists`] and commits none of the batch.
    pub async fn insert_all(
        &self,
        collection: &str,
        data_list: Vec<Document>,
    ) -> ContainerResult<Vec<Record>> {
        self.ensure_loaded()?;

        let mut prepared = Vec::with_capacity(data_list.len());
        for data in data_list {
            prepared.push(self.prepare_insert(collection, data).await?);
        }

        let stored = self
            .adapter
            .bulk_insert(collection, prepared)
            .await?;

        stored
            .into_iter()
            .map(|document| Record::from_stored(collection, document))
            .collect()
    }

    async fn prepare_insert(
        &self,
        collection: &str,
        data: Document,
    ) -> ContainerResult<(Option<String>, Document)> {
        let mapper = self.mapper(collection)?;
        validate(mapper, &data)?;
        relation::resolve(&self.adapter, mapper, &data).await?;

        let mut data = data;
        if let Some(hook) = &self.before_insert {
            hook(&mut data);
        }

        let id = take_id(&mut data)?;
        Ok((id, data))
    }

    /// Returns the records matching `query`, which may be a [`Query`], a
    /// bare options document in the `$where`/`$skip`/`$limit` form, or
    /// anything else normalizable into a query.
    ///
    /// `$skip` applies before `$limit`; result order is adapter-determined
    /// and not guaranteed stable.
    pub async fn find_all<Q>(&self, collection: &str, query: Q) -> ContainerResult<Vec<Record>>
    where
        Q: TryInto<Query>,
        Q::Error: Into<ContainerError>,
    {
        self.ensure_loaded()?;
        self.mapper(collection)?;
        let query = query.try_into().map_err(Into::into)?;

        let documents = self.adapter.find(collection, query).await?;

        documents
            .into_iter()
            .map(|document| Record::from_stored(collection, document))
            .collect()
    }

    /// Retrieves a single record by id.
    ///
    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if no document with that id exists.
    pub async fn get(&self, collection: &str, id: &str) -> ContainerResult<Record> {
        self.ensure_loaded()?;
        self.mapper(collection)?;

        let document = self.adapter.get(collection, id).await?;
        Record::from_stored(collection, document)
    }

    /// Replaces a document entirely. `data` is the full new field set, not a
    /// merge. The document is re-validated, relations re-resolved and the
    /// `before_update` hook applied before the adapter write.
    ///
    /// A successful replace keeps the id and always yields a `rev` distinct
    /// from the prior one.
    ///
    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if `id` does not exist, plus the same
    /// validation/relation failures as [`insert`](Container::insert).
    pub async fn replace(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> ContainerResult<Record> {
        self.ensure_loaded()?;
        let mapper = self.mapper(collection)?;
        validate(mapper, &data)?;
        relation::resolve(&self.adapter, mapper, &data).await?;

        let mut data = data;
        if let Some(hook) = &self.before_update {
            hook(&mut data);
        }

        // Identity comes from the call, not the payload.
        data.remove("id");
        data.remove("rev");

        let stored = self
            .adapter
            .replace(collection, id, data)
            .await?;

        Record::from_stored(collection, stored)
    }

    /// Removes a document, accepting either a raw identifier or a previously
    /// returned [`Record`].
    ///
    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if the document does not exist; removing
    /// the same id twice deterministically fails the second time.
    pub async fn remove(&self, collection: &str, id: impl AsRecordId) -> ContainerResult<()> {
        self.ensure_loaded()?;
        self.mapper(collection)?;

        self.adapter
            .remove(collection, id.record_id())
            .await?;

        Ok(())
    }

    fn ensure_loaded(&self) -> ContainerResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(ContainerError::NotLoaded)
        }
    }

    fn mapper(&self, collection: &str) -> ContainerResult<&Mapper> {
        self.mappers
            .get(collection)
            .ok_or_else(|| ContainerError::UnknownMapper(collection.to_string()))
    }
}

fn take_id(data: &mut Document) -> ContainerResult<Option<String>> {
    match data.remove("id") {
        None => Ok(None),
        Some(Bson::String(id)) => Ok(Some(id)),
        Some(other) => Err(ContainerError::Validation {
            field: "id".to_string(),
            reason: format!("identifier must be a string, got {:?}", other),
        }),
    }
}

impl<A: Adapter> fmt::Debug for Container<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("adapter", &self.adapter)
            .field("mappers", &self.mappers.keys().collect::<Vec<_>>())
            .field("is_loaded", &self.is_loaded())
            .field("is_loading", &self.is_loading())
            .finish()
    }
}

/// Builder for [`Container`] instances.
///
/// Mappers and hooks are fixed at build time; the registry is immutable for
/// the container's lifetime.
pub struct ContainerBuilder<A: Adapter> {
    adapter: A,
    mappers: HashMap<String, Mapper>,
    before_insert: Option<Hook>,
    before_update: Option<Hook>,
}

impl<A: Adapter> ContainerBuilder<A> {
    /// Registers a mapper for the named collection.
    pub fn mapper(mut self, collection: impl Into<String>, mapper: Mapper) -> Self {
        self.mappers.insert(collection.into(), mapper);
        self
    }

    /// Registers several mappers at once.
    pub fn mappers<I, S>(mut self, mappers: I) -> Self
    where
        I: IntoIterator<Item = (S, Mapper)>,
        S: Into<String>,
    {
        self.mappers
            .extend(mappers.into_iter().map(|(name, mapper)| (name.into(), mapper)));
        self
    }

    /// Sets the hook invoked with every candidate document before insertion.
    pub fn before_insert<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Document) + Send + Sync + 'static,
    {
        self.before_insert = Some(Box::new(hook));
        self
    }

    /// Sets the hook invoked with every candidate document before replacement.
    pub fn before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Document) + Send + Sync + 'static,
    {
        self.before_update = Some(Box::new(hook));
        self
    }

    /// Builds the container in the unloaded state.
    pub fn build(self) -> Container<A> {
        Container {
            adapter: self.adapter,
            mappers: self.mappers,
            before_insert: self.before_insert,
            before_update: self.before_update,
            loaded: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        }
    }
}
