//! In-memory table store.
//!
//! [`MemoryStore`] is the persistence backend a session commits to: one
//! insertion-ordered table per registered model, a key index per table and
//! a key sequence for auto-increment models.
//!
//! Writes arrive as a batch of [`Write`] entries: plain puts, plus moves
//! for rows whose primary key changed. The whole batch is checked against
//! table constraints (not-null, unique, relation targets, key typing)
//! before anything is applied, so a rejected batch leaves every table
//! exactly as it was.

use std::collections::{HashMap, HashSet};

use dynmodel_core::{Error, FieldType, Instance, ModelRegistry, RecordKey, Result, Value};

// ============================================================================
// Table
// ============================================================================

/// One model's rows.
#[derive(Debug, Default)]
struct Table {
    /// Rows in insertion order.
    rows: Vec<Instance>,
    /// Primary key -> index into `rows`.
    index: HashMap<RecordKey, usize>,
    /// High-water mark for assigned integer keys.
    sequence: i64,
}

impl Table {
    fn fetch(&self, key: &RecordKey) -> Option<&Instance> {
        self.index.get(key).and_then(|&i| self.rows.get(i))
    }

    /// Explicit integer keys advance the sequence so later assigned keys
    /// cannot collide with them.
    fn advance_sequence(&mut self, key: &RecordKey) {
        if let RecordKey::Int(i) = key {
            if *i > self.sequence {
                self.sequence = *i;
            }
        }
    }

    /// Insert or replace the row under `key`.
    fn put(&mut self, instance: Instance, key: RecordKey) {
        self.advance_sequence(&key);
        if let Some(&i) = self.index.get(&key) {
            if let Some(slot) = self.rows.get_mut(i) {
                *slot = instance;
            }
        } else {
            self.index.insert(key, self.rows.len());
            self.rows.push(instance);
        }
    }

    /// Move the row under `old` to `key`, replacing its contents. The row
    /// keeps its place in insertion order.
    fn rekey(&mut self, old: &RecordKey, instance: Instance, key: RecordKey) {
        let Some(i) = self.index.remove(old) else {
            // Nothing stored under the old key; a plain insert then.
            self.put(instance, key);
            return;
        };
        self.advance_sequence(&key);
        if let Some(slot) = self.rows.get_mut(i) {
            *slot = instance;
        }
        self.index.insert(key, i);
    }
}

// ============================================================================
// Batch Writes
// ============================================================================

/// One row of a commit batch.
pub(crate) enum Write<'a> {
    /// Insert the row, or replace the row already under its key.
    Put(&'a Instance),
    /// Write the row under its current key and free the given key, the
    /// one it moves away from.
    Move(&'a Instance, RecordKey),
}

impl Write<'_> {
    fn instance(&self) -> &Instance {
        match self {
            Self::Put(instance) | Self::Move(instance, _) => instance,
        }
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// An in-memory store with one table per registered model.
#[derive(Debug)]
pub struct MemoryStore {
    /// Tables by model name.
    tables: HashMap<String, Table>,
}

impl MemoryStore {
    /// Create an empty store with a table for every registered model.
    pub(crate) fn new(registry: &ModelRegistry) -> Self {
        let tables = registry
            .iter()
            .map(|model| (model.name().to_string(), Table::default()))
            .collect();
        Self { tables }
    }

    /// Number of rows in a model's table.
    pub fn len(&self, model: &str) -> usize {
        self.tables.get(model).map_or(0, |t| t.rows.len())
    }

    /// Whether a model's table holds no rows.
    pub fn is_empty(&self, model: &str) -> bool {
        self.len(model) == 0
    }

    /// Whether a row with this key exists.
    pub fn contains(&self, model: &str, key: &RecordKey) -> bool {
        self.tables
            .get(model)
            .is_some_and(|t| t.index.contains_key(key))
    }

    /// Fetch a copy of the row under `key`.
    pub fn fetch(&self, model: &str, key: &RecordKey) -> Option<Instance> {
        self.tables.get(model).and_then(|t| t.fetch(key)).cloned()
    }

    /// Copies of all rows matching every filter, in insertion order.
    pub fn scan(&self, model: &str, filters: &[(String, Value)]) -> Vec<Instance> {
        self.tables.get(model).map_or_else(Vec::new, |table| {
            table
                .rows
                .iter()
                .filter(|row| filters.iter().all(|(field, value)| row.get(field) == Some(value)))
                .cloned()
                .collect()
        })
    }

    /// Assign the next integer key for a model.
    ///
    /// Fails only once the sequence has reached `i64::MAX`, after a row
    /// was stored under that explicit key.
    pub(crate) fn reserve_key(&mut self, model: &str) -> Result<i64> {
        let table = self.tables.entry(model.to_string()).or_default();
        let Some(next) = table.sequence.checked_add(1) else {
            return Err(Error::SequenceExhausted {
                model: model.to_string(),
            });
        };
        table.sequence = next;
        Ok(next)
    }

    /// Check the whole batch, then write every row.
    ///
    /// Rows keyed like an existing row replace it; within a batch the last
    /// row under a key wins. A move frees its old key in the same step.
    /// On error nothing is written.
    pub(crate) fn apply(&mut self, batch: &[Write<'_>]) -> Result<()> {
        let keys = self.check(batch)?;
        for (write, key) in batch.iter().zip(keys) {
            let table = self
                .tables
                .entry(write.instance().model().name().to_string())
                .or_default();
            match write {
                Write::Put(instance) => table.put((*instance).clone(), key),
                Write::Move(instance, old) => table.rekey(old, (*instance).clone(), key),
            }
        }
        Ok(())
    }

    /// Validate a batch against constraints without writing anything.
    ///
    /// Returns the primary key of each row, in batch order.
    fn check(&self, batch: &[Write<'_>]) -> Result<Vec<RecordKey>> {
        // Keys first; every check below needs them.
        let mut keys = Vec::with_capacity(batch.len());
        for write in batch {
            let instance = write.instance();
            let model = instance.model();
            let Some(pk) = model.primary_key() else {
                return Err(Error::NoPrimaryKey {
                    model: model.name().to_string(),
                });
            };
            let value = instance.get(&pk.name).cloned().unwrap_or(Value::Null);
            let Some(key) = RecordKey::from_value(&value) else {
                return Err(Error::InvalidKey {
                    model: model.name().to_string(),
                    value: value.to_string(),
                });
            };
            // The held key must agree with the declared key type.
            let agrees = matches!(
                (&key, pk.field_type),
                (RecordKey::Int(_), FieldType::BigInt) | (RecordKey::Text(_), FieldType::Text)
            );
            if !agrees {
                return Err(Error::InvalidKey {
                    model: model.name().to_string(),
                    value: value.to_string(),
                });
            }
            // A move cannot land on a key another row still holds.
            if let Write::Move(_, old) = write {
                if old != &key && self.contains(model.name(), &key) {
                    return Err(Error::DuplicateKey {
                        model: model.name().to_string(),
                        key,
                    });
                }
            }
            keys.push(key);
        }

        // Rows under these keys are superseded by the batch, so the
        // uniqueness scan skips them. A move also supersedes the row
        // under the key it vacates.
        let mut replaced: HashSet<(&str, &RecordKey)> = batch
            .iter()
            .zip(&keys)
            .map(|(write, key)| (write.instance().model().name(), key))
            .collect();
        for write in batch {
            if let Write::Move(instance, old) = write {
                replaced.insert((instance.model().name(), old));
            }
        }

        for (i, write) in batch.iter().enumerate() {
            let instance = write.instance();
            let model = instance.model();
            let model_name = model.name();

            for field in model.fields() {
                if field.nullable {
                    continue;
                }
                if instance.get(&field.name).is_none_or(Value::is_null) {
                    return Err(Error::NotNull {
                        model: model_name.to_string(),
                        field: field.name.clone(),
                    });
                }
            }

            // Unique fields; null never collides, as in SQL.
            for field in model.fields() {
                if !field.unique {
                    continue;
                }
                let Some(value) = instance.get(&field.name) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                if let Some(table) = self.tables.get(model_name) {
                    for row in &table.rows {
                        if let Some(row_key) = row.key() {
                            if replaced.contains(&(model_name, &row_key)) {
                                continue;
                            }
                        }
                        if row.get(&field.name) == Some(value) {
                            return Err(Error::UniqueViolation {
                                model: model_name.to_string(),
                                field: field.name.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
                for other in batch.iter().take(i) {
                    let other = other.instance();
                    if other.model().name() == model_name && other.get(&field.name) == Some(value) {
                        return Err(Error::UniqueViolation {
                            model: model_name.to_string(),
                            field: field.name.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }

            // Every related key must have a row, either already stored or
            // arriving in this same batch.
            for (name, slot) in instance.relations() {
                let Some(def) = model.relation_named(name) else {
                    return Err(Error::UnknownRelation {
                        model: model_name.to_string(),
                        field: name.clone(),
                    });
                };
                for key in slot.keys() {
                    let in_store = self.contains(&def.target, key);
                    let in_batch = batch.iter().zip(&keys).any(|(other, other_key)| {
                        other.instance().model().name() == def.target && other_key == key
                    });
                    if !in_store && !in_batch {
                        return Err(Error::ForeignKey {
                            model: model_name.to_string(),
                            relation: name.clone(),
                            target: def.target.clone(),
                            key: key.clone(),
                        });
                    }
                }
            }
        }

        Ok(keys)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
