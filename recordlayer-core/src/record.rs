//! Validated, identity-bearing wrappers around stored documents.
//!
//! A [`Record`] is produced by the container for every successfully inserted,
//! loaded or replaced document; callers never construct one directly. Records
//! are value-like snapshots; the container does not track them after return,
//! so relation checks always re-read current storage state.

use bson::{Bson, DateTime, Document};

use crate::error::{ContainerError, ContainerResult};

/// A stored document together with its identity and revision.
///
/// The visible field set is exactly the mapper-declared fields present on the
/// stored document plus `id`, `rev` and the hook-stamped timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    collection: String,
    id: String,
    rev: String,
    document: Document,
}

impl Record {
    /// Wraps a document returned by the adapter. The stored form must carry
    /// `id` and `rev` string fields.
    pub(crate) fn from_stored(collection: &str, document: Document) -> ContainerResult<Self> {
        let id = match document.get("id") {
            Some(Bson::String(id)) => id.clone(),
            _ => {
                return Err(ContainerError::Serialization(format!(
                    "stored document in collection {} is missing a string id",
                    collection
                )));
            }
        };

        let rev = match document.get("rev") {
            Some(Bson::String(rev)) => rev.clone(),
            _ => {
                return Err(ContainerError::Serialization(format!(
                    "stored document {} in collection {} is missing a string rev",
                    id, collection
                )));
            }
        };

        Ok(Self { collection: collection.to_string(), id, rev, document })
    }

    /// The document's unique identifier within its collection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The opaque revision token. Changes on every successful mutation.
    pub fn rev(&self) -> &str {
        &self.rev
    }

    /// The collection this record was read from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The insertion timestamp, if a `before_insert` hook stamped one.
    pub fn created_at(&self) -> Option<DateTime> {
        self.document
            .get("createdAt")
            .and_then(Bson::as_datetime)
            .copied()
    }

    /// The last-update timestamp, if a `before_update` hook stamped one.
    pub fn updated_at(&self) -> Option<DateTime> {
        self.document
            .get("updatedAt")
            .and_then(Bson::as_datetime)
            .copied()
    }

    /// Reads a field value from the stored document.
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.document.get(field)
    }

    /// Reads a string field value from the stored document.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.document.get(field).and_then(Bson::as_str)
    }

    /// Iterates the field names present on the stored document.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.document.keys().map(String::as_str)
    }

    /// Borrows the underlying stored document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consumes the record, returning the underlying stored document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Conversion used by operations that accept either a raw identifier or a
/// previously returned record.
pub trait AsRecordId {
    /// Borrows the identifier.
    fn record_id(&self) -> &str;
}

impl AsRecordId for str {
    fn record_id(&self) -> &str {
        self
    }
}

impl AsRecordId for String {
    fn record_id(&self) -> &str {
        self
    }
}

impl AsRecordId for Record {
    fn record_id(&self) -> &str {
        self.id()
    }
}

impl<T: AsRecordId + ?Sized> AsRecordId for &T {
    fn record_id(&self) -> &str {
        (**self).record_id()
    }
}
