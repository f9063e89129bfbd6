//! Referential checks for relationship fields.
//!
//! A relationship is an array field whose item spec names a mapper; each
//! element must be the id of an existing record in that mapper's collection.
//! Storage itself enforces no foreign keys, so this resolver is the sole
//! guarantor of referential integrity, applied before every write commits.

use bson::{Bson, Document};
use futures::future::join_all;

use crate::{
    adapter::Adapter,
    error::{AdapterError, ContainerError, ContainerResult},
    mapper::Mapper,
};

/// Verifies every identifier referenced by `candidate`'s relationship fields.
///
/// All existence checks for one write run concurrently. Results are inspected
/// in the mapper's deterministic field order, so the reported failure does not
/// depend on adapter timing. Nothing is written here; the caller only issues
/// the guarded write once this resolves.
///
/// # Errors
///
/// [`ContainerError::Relation`] for the first dangling identifier; any other
/// adapter failure is translated and propagated as-is.
pub async fn resolve<A: Adapter>(
    adapter: &A,
    mapper: &Mapper,
    candidate: &Document,
) -> ContainerResult<()> {
    let mut checks = Vec::new();

    for (field, target) in mapper.relations() {
        if let Some(Bson::Array(items)) = candidate.get(field) {
            for item in items {
                if let Bson::String(id) = item {
                    checks.push((field, target, id.as_str()));
                }
            }
        }
    }

    if checks.is_empty() {
        return Ok(());
    }

    let results = join_all(
        checks
            .iter()
            .map(|(_, target, id)| adapter.get(target, id)),
    )
    .await;

    for ((field, target, _), result) in checks.iter().zip(results) {
        match result {
            Ok(_) => {}
            Err(AdapterError::NotFound { .. }) => {
                return Err(ContainerError::Relation {
                    mapper: target.to_string(),
                    field: field.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterResult;
    use crate::mapper::{FieldSpec, ItemSpec};
    use crate::query::Query;
    use async_trait::async_trait;
    use bson::doc;
    use std::collections::HashSet;

    /// Adapter stub that only answers existence checks.
    #[derive(Debug, Default)]
    struct ExistingIds {
        ids: HashSet<(String, String)>,
    }

    impl ExistingIds {
        fn with(ids: &[(&str, &str)]) -> Self {
            Self {
                ids: ids
                    .iter()
                    .map(|(c, id)| (c.to_string(), id.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Adapter for ExistingIds {
        fn database_name(&self) -> &str {
            "test"
        }

        async fn database_names(&self) -> AdapterResult<Vec<String>> {
            Ok(vec!["test".to_string()])
        }

        async fn create_database(&self) -> AdapterResult<()> {
            Ok(())
        }

        async fn drop_database(&self) -> AdapterResult<()> {
            Ok(())
        }

        async fn ensure_collection(&self, _name: &str) -> AdapterResult<()> {
            Ok(())
        }

        async fn insert(
            &self,
            _collection: &str,
            _id: Option<String>,
            _document: Document,
        ) -> AdapterResult<Document> {
            unimplemented!("not used by the resolver")
        }

        async fn bulk_insert(
            &self,
            _collection: &str,
            _documents: Vec<(Option<String>, Document)>,
        ) -> AdapterResult<Vec<Document>> {
            unimplemented!("not used by the resolver")
        }

        async fn find(&self, _collection: &str, _query: Query) -> AdapterResult<Vec<Document>> {
            unimplemented!("not used by the resolver")
        }

        async fn get(&self, collection: &str, id: &str) -> AdapterResult<Document> {
            if self
                .ids
                .contains(&(collection.to_string(), id.to_string()))
            {
                Ok(doc! { "id": id, "rev": "r1" })
            } else {
                Err(AdapterError::NotFound {
                    id: id.to_string(),
                    collection: collection.to_string(),
                })
            }
        }

        async fn replace(
            &self,
            _collection: &str,
            _id: &str,
            _document: Document,
        ) -> AdapterResult<Document> {
            unimplemented!("not used by the resolver")
        }

        async fn remove(&self, _collection: &str, _id: &str) -> AdapterResult<()> {
            unimplemented!("not used by the resolver")
        }
    }

    fn accounts_mapper() -> Mapper {
        Mapper::builder()
            .field("people", FieldSpec::array().items(ItemSpec::string().mapper("people")))
            .build()
    }

    #[tokio::test]
    async fn passes_when_every_reference_exists() {
        let adapter = ExistingIds::with(&[("people", "p1"), ("people", "p2")]);
        let candidate = doc! { "people": ["p1", "p2"] };

        assert!(resolve(&adapter, &accounts_mapper(), &candidate)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn fails_with_relation_error_for_dangling_reference() {
        let adapter = ExistingIds::with(&[("people", "p1")]);
        let candidate = doc! { "people": ["p1", "00000000"] };

        let err = resolve(&adapter, &accounts_mapper(), &candidate)
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("should be an existing people record"));
        assert!(matches!(err, ContainerError::Relation { mapper, .. } if mapper == "people"));
    }

    #[tokio::test]
    async fn skips_fields_without_a_mapper_target() {
        let mapper = Mapper::builder()
            .field("tags", FieldSpec::array().items(ItemSpec::string()))
            .build();
        let adapter = ExistingIds::default();
        let candidate = doc! { "tags": ["a", "b"] };

        assert!(resolve(&adapter, &mapper, &candidate).await.is_ok());
    }
}
