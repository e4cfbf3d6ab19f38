//! Name-addressed records with an explicit session.
//!
//! `dynmodel` works with models described at runtime: models are plain
//! metadata registered by name, records are [`Instance`]s of that
//! metadata, and all persistence flows through an explicit [`Session`]
//! handle. The [`facade`] module compresses the everyday flows into
//! single calls addressed by model name.
//!
//! # Role In The Architecture
//!
//! - **`dynmodel-core`** (re-exported here): values, keys, schema
//!   metadata, the model registry and record instances.
//! - **[`store`]**: in-memory tables with constraint checks; one table
//!   per registered model.
//! - **[`session`]**: the unit of work. Records are registered with
//!   `add` and written atomically per `commit`.
//! - **[`query`]**: composable equality queries over one model's table.
//! - **[`facade`]**: `get`/`create`/`one`/`every`/`one_or_create`/
//!   `change`/`relate`/`chain_relate`, each committing before it
//!   returns.
//!
//! # Example
//!
//! ```ignore
//! use dynmodel::prelude::*;
//!
//! let registry = Arc::new(ModelRegistry::builder().model(user).model(post).build()?);
//! let mut session = Session::new(registry);
//!
//! let mut peter = facade::create(&mut session, "User", values!["name" => "Peter"])?;
//! let post = facade::create(&mut session, "Post", values!["title" => "Hello"])?;
//! facade::relate(&mut session, &mut peter, &post, "posts")?;
//!
//! let peters = facade::every(&session, "User", values!["name" => "Peter"])?;
//! ```
//!
//! See [`facade`] for a complete runnable example.

pub mod facade;
pub mod prelude;
pub mod query;
pub mod session;
pub mod store;

pub use dynmodel_core::values;
pub use dynmodel_core::{
    Cardinality, Error, FieldDef, FieldType, Instance, InstanceId, ModelRegistry,
    ModelRegistryBuilder, ModelType, RecordKey, RelationDef, RelationValue, Result, Value,
};
pub use query::Query;
pub use session::{Session, SessionDebugInfo};
pub use store::MemoryStore;
