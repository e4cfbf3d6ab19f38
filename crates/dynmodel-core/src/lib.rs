//! Core types for DynModel.
//!
//! `dynmodel-core` is the **foundation layer** for the ecosystem. It defines
//! the data that everything else moves around: values, keys, schema
//! metadata, the model registry and record instances.
//!
//! # Role In The Architecture
//!
//! - **Data model**: [`Value`] and [`RecordKey`] are the unit of exchange
//!   between records, queries and the store.
//! - **Schema metadata**: [`ModelType`], [`FieldDef`] and [`RelationDef`]
//!   describe models at runtime, as plain data rather than derives.
//! - **Name resolution**: [`ModelRegistry`] is the single authority that
//!   turns model names into validated [`ModelType`]s.
//! - **Records**: [`Instance`] binds one row's values and relation keys to
//!   its model type.
//!
//! # Who Uses This Crate
//!
//! - `dynmodel` builds its session, store, query and facade layers on the
//!   types defined here.
//!
//! Most applications should use the `dynmodel` facade; reach for
//! `dynmodel-core` directly when building alternative storage or session
//! layers over the same record model.

pub mod error;
pub mod instance;
pub mod registry;
pub mod schema;
pub mod value;

pub use error::{Error, Result};
pub use instance::{Instance, InstanceId, RelationValue};
pub use registry::{ModelRegistry, ModelRegistryBuilder};
pub use schema::{Cardinality, FieldDef, FieldType, ModelType, RelationDef};
pub use value::{RecordKey, Value};
