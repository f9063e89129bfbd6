//! Convenient re-exports of commonly used types from recordlayer.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use recordlayer::prelude::*;
//! ```

pub use recordlayer_core::{
    adapter::Adapter,
    container::{Container, ContainerBuilder, Hook},
    error::{AdapterError, AdapterResult, ContainerError, ContainerResult},
    mapper::{FieldSpec, FieldType, ItemSpec, Mapper, MapperBuilder},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor},
    record::{AsRecordId, Record},
    validate::validate,
};
