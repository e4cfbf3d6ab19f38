//! Composable equality queries.
//!
//! A [`Query`] borrows its session and composes filters without touching
//! the store; rows only move when a terminal operation
//! ([`get`](Query::get), [`one_or_none`](Query::one_or_none),
//! [`all`](Query::all)) runs. Filters are equality-only and conjunctive:
//! a row matches when every filter matches.

use dynmodel_core::{Error, Instance, ModelType, RecordKey, Result, Value};

use crate::session::Session;

/// A filtered view over one model's table.
#[derive(Debug)]
pub struct Query<'s> {
    session: &'s Session,
    model: &'s ModelType,
    filters: Vec<(String, Value)>,
}

impl<'s> Query<'s> {
    pub(crate) fn new(session: &'s Session, model: &'s ModelType) -> Self {
        Self {
            session,
            model,
            filters: Vec::new(),
        }
    }

    /// Name of the model this query runs against.
    pub fn model(&self) -> &str {
        self.model.name()
    }

    /// Filters composed so far, in composition order.
    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    /// Add an equality filter on a field.
    ///
    /// Unknown field names fail here, at composition time; a typo should
    /// not wait for execution to surface.
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        if self.model.field_named(field).is_none() {
            return Err(Error::UnknownField {
                model: self.model.name().to_string(),
                field: field.to_string(),
            });
        }
        self.filters.push((field.to_string(), value.into()));
        Ok(self)
    }

    /// Fetch by primary key.
    ///
    /// `None` when no row holds the key, and also when the value cannot
    /// be a key at all (a float, say): absence is an answer, not an
    /// error. Composed filters still apply, so a row that fails them is
    /// `None` too.
    pub fn get(&self, key: impl Into<Value>) -> Option<Instance> {
        let value = key.into();
        let key = RecordKey::from_value(&value)?;
        let row = self.session.store().fetch(self.model.name(), &key)?;
        let matches = self
            .filters
            .iter()
            .all(|(field, value)| row.get(field) == Some(value));
        matches.then_some(row)
    }

    /// Execute, expecting at most one matching row.
    pub fn one_or_none(&self) -> Result<Option<Instance>> {
        let mut rows = self.all();
        if rows.len() > 1 {
            return Err(Error::MultipleRows {
                model: self.model.name().to_string(),
                found: rows.len(),
            });
        }
        Ok(rows.pop())
    }

    /// Execute, returning every matching row in insertion order.
    pub fn all(&self) -> Vec<Instance> {
        self.session.store().scan(self.model.name(), &self.filters)
    }

    /// Execute, returning only the number of matching rows.
    pub fn count(&self) -> usize {
        self.all().len()
    }
}
