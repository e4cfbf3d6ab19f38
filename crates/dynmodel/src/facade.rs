//! Convenience operations over a session.
//!
//! The functions here compress the common create/query/update/link flows
//! into single calls addressed by model name. Each one is a thin recipe
//! over [`Session`] and [`Query`]: `get(&session, "User", 1)` is
//! `session.query("User")?.get(1)`, `create` is construct-add-commit, and
//! so on. Anything the recipes don't cover is available by dropping down
//! to the session directly.
//!
//! Mutating operations register the touched record and commit before
//! returning, so a change is durable the moment its call returns. There
//! is no surrounding transaction: `one_or_create` and `chain_relate`
//! issue several commits, and a failure partway through leaves the
//! earlier commits in place.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dynmodel::facade;
//! use dynmodel::{
//!     FieldDef, FieldType, ModelRegistry, ModelType, RelationDef, Session, values,
//! };
//!
//! # fn main() -> dynmodel::Result<()> {
//! let registry = Arc::new(
//!     ModelRegistry::builder()
//!         .model(
//!             ModelType::new("User")
//!                 .field(
//!                     FieldDef::new("id", FieldType::BigInt)
//!                         .primary_key()
//!                         .auto_increment(),
//!                 )
//!                 .field(FieldDef::new("name", FieldType::Text))
//!                 .field(FieldDef::new("age", FieldType::BigInt).nullable())
//!                 .relation(RelationDef::many("posts", "Post")),
//!         )
//!         .model(
//!             ModelType::new("Post")
//!                 .field(
//!                     FieldDef::new("id", FieldType::BigInt)
//!                         .primary_key()
//!                         .auto_increment(),
//!                 )
//!                 .field(FieldDef::new("title", FieldType::Text)),
//!         )
//!         .build()?,
//! );
//! let mut session = Session::new(registry);
//!
//! let mut peter = facade::create(&mut session, "User", values!["name" => "Peter", "age" => 20])?;
//! let post = facade::create(&mut session, "Post", values!["title" => "Hello"])?;
//! facade::relate(&mut session, &mut peter, &post, "posts")?;
//!
//! let found = facade::get(&session, "User", 1)?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dynmodel_core::{Error, Instance, Result, Value};

use crate::query::Query;
use crate::session::Session;

/// Fetch one record by primary key.
///
/// `Ok(None)` when no row holds the key; only an unknown model name is
/// an error.
pub fn get(session: &Session, model: &str, key: impl Into<Value>) -> Result<Option<Instance>> {
    Ok(session.query(model)?.get(key))
}

/// Construct a record from field values and commit it immediately.
///
/// Auto-increment models get their key assigned during the call, so the
/// returned instance always knows where it lives. Constraint violations
/// surface as the commit error and leave the store unchanged.
#[tracing::instrument(level = "debug", skip(session, values))]
pub fn create(session: &mut Session, model: &str, values: Vec<(String, Value)>) -> Result<Instance> {
    let model_type = Arc::clone(session.registry().resolve(model)?);
    let mut instance = Instance::new(&model_type, values)?;
    session.add(&mut instance)?;
    session.commit()?;
    Ok(instance)
}

/// Compose a query from equality filters without executing it.
///
/// All filters must match (conjunction). An empty filter list matches
/// every row.
pub fn query<'s>(
    session: &'s Session,
    model: &str,
    filters: Vec<(String, Value)>,
) -> Result<Query<'s>> {
    let mut query = session.query(model)?;
    for (field, value) in filters {
        query = query.filter(&field, value)?;
    }
    Ok(query)
}

/// Fetch the record matching the filters, if there is exactly one.
///
/// `Ok(None)` when nothing matches; [`Error::MultipleRows`] when more
/// than one row does.
pub fn one(session: &Session, model: &str, filters: Vec<(String, Value)>) -> Result<Option<Instance>> {
    query(session, model, filters)?.one_or_none()
}

/// Fetch every record matching the filters, in insertion order.
pub fn every(session: &Session, model: &str, filters: Vec<(String, Value)>) -> Result<Vec<Instance>> {
    Ok(query(session, model, filters)?.all())
}

/// Fetch the single matching record, creating it if nothing matches.
///
/// The same values serve as filters and as construction values. The two
/// steps are not atomic: the lookup and the create are separate store
/// operations, and an ambiguous match fails with
/// [`Error::MultipleRows`] before anything is written.
#[tracing::instrument(level = "debug", skip(session, values))]
pub fn one_or_create(
    session: &mut Session,
    model: &str,
    values: Vec<(String, Value)>,
) -> Result<Instance> {
    if let Some(existing) = one(session, model, values.clone())? {
        return Ok(existing);
    }
    create(session, model, values)
}

/// Overwrite fields on a record and commit the update immediately.
///
/// Every name is checked against the model before the write lands;
/// setting no values, or values equal to the current state, commits
/// nothing. Overwriting the primary key moves the row rather than
/// copying it; the old key is freed by the same commit.
#[tracing::instrument(level = "debug", skip(session, instance, values), fields(model = instance.model().name()))]
pub fn change(
    session: &mut Session,
    instance: &mut Instance,
    values: Vec<(String, Value)>,
) -> Result<()> {
    for (field, value) in values {
        instance.set(&field, value)?;
    }
    session.add(instance)?;
    session.commit()
}

/// Link a committed child record into a relation of `parent`, then
/// commit the parent.
///
/// Multi-valued relations append unless the child's key is already
/// attached (linking twice holds one copy); single-valued relations are
/// overwritten. Relations hold keys, not embedded records, so the child
/// must already have a primary key; [`Error::MissingKey`] otherwise.
#[tracing::instrument(level = "debug", skip(session, parent, child), fields(model = parent.model().name()))]
pub fn relate(
    session: &mut Session,
    parent: &mut Instance,
    child: &Instance,
    relation: &str,
) -> Result<()> {
    let Some(key) = child.key() else {
        return Err(Error::MissingKey {
            model: child.model().name().to_string(),
        });
    };

    let changed = parent.relate_key(relation, key)?;
    if changed {
        tracing::debug!("Attached related record");
    } else {
        tracing::debug!("Related record already attached");
    }

    session.add(parent)?;
    session.commit()
}

/// Link several children into a relation of `parent`, in order.
///
/// Each link is its own [`relate`] call with its own commit. On the
/// first failure the remaining children are not attempted and the links
/// already committed stay in place.
#[tracing::instrument(level = "debug", skip(session, parent, children), fields(model = parent.model().name(), children = children.len()))]
pub fn chain_relate(
    session: &mut Session,
    parent: &mut Instance,
    children: &[&Instance],
    relation: &str,
) -> Result<()> {
    for child in children {
        relate(session, parent, child, relation)?;
    }
    Ok(())
}
