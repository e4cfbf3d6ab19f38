//! One-line import for application code.
//!
//! ```ignore
//! use dynmodel::prelude::*;
//! ```
//!
//! Brings in the registry and schema builders, the session and query
//! types, the [`facade`](crate::facade) module itself, and the
//! [`values!`](crate::values) macro.

pub use crate::facade;
pub use crate::query::Query;
pub use crate::session::Session;
pub use crate::store::MemoryStore;
pub use crate::values;
pub use dynmodel_core::{
    Cardinality, Error, FieldDef, FieldType, Instance, ModelRegistry, ModelRegistryBuilder,
    ModelType, RecordKey, RelationDef, RelationValue, Result, Value,
};
