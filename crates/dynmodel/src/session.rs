//! Session: the explicit unit-of-work handle.
//!
//! A [`Session`] owns its [`MemoryStore`] and shares a
//! [`ModelRegistry`]. Records are registered with [`add`](Session::add)
//! and written by [`commit`](Session::commit); between the two they sit in
//! a pending list, keyed by `(model, primary key)`.
//!
//! # Design Philosophy
//!
//! - **Explicit over implicit**: nothing is written until `commit`; there
//!   is no ambient or thread-local session to fall back on.
//! - **Ownership clarity**: the session owns the store, so all access to
//!   rows flows through a session handle.
//! - **Identity tracking**: committed and loaded rows are remembered by
//!   [`InstanceId`], which is how an update of a known row is told apart
//!   from a new record colliding with an existing key, and how a
//!   primary-key overwrite is recognized as the same row moving rather
//!   than a second row appearing.
//!
//! A failed commit leaves both the store and the pending list untouched:
//! the caller can repair the offending record, re-`add` it and commit
//! again, or [`rollback`](Session::rollback) to discard the pending
//! records. Each commit is atomic on its own, but a sequence of commits
//! is not a transaction: an error between two commits leaves the
//! earlier one in place.

use std::collections::HashMap;
use std::sync::Arc;

use dynmodel_core::{Error, Instance, InstanceId, ModelRegistry, RecordKey, Result, Value};

use crate::query::Query;
use crate::store::{MemoryStore, Write};

// ============================================================================
// Row Key
// ============================================================================

/// Address of one row: model name plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowKey {
    model: String,
    key: RecordKey,
}

/// A record waiting for the next commit.
#[derive(Debug)]
struct PendingRow {
    row_key: RowKey,
    instance: Instance,
    /// Serialized state at registration, for unchanged-skip on re-add.
    snapshot: Option<serde_json::Value>,
    /// Committed key this row vacates, when its primary key was
    /// overwritten since the last commit.
    displaces: Option<RecordKey>,
}

// ============================================================================
// Session
// ============================================================================

/// An explicit unit-of-work over an in-memory store.
#[derive(Debug)]
pub struct Session {
    /// Shared schema authority.
    registry: Arc<ModelRegistry>,
    /// The tables this session commits to.
    store: MemoryStore,
    /// Records registered since the last successful commit, in order.
    pending: Vec<PendingRow>,
    /// Row address -> index into `pending`.
    pending_index: HashMap<RowKey, usize>,
    /// Identity of the record that owns each stored row.
    identity_map: HashMap<RowKey, InstanceId>,
    /// Serialized state of each row as of its last commit.
    clean: HashMap<RowKey, serde_json::Value>,
}

impl Session {
    /// Create a session with an empty store over the given registry.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let store = MemoryStore::new(&registry);
        Self {
            registry,
            store,
            pending: Vec::new(),
            pending_index: HashMap::new(),
            identity_map: HashMap::new(),
            clean: HashMap::new(),
        }
    }

    /// The registry this session resolves model names against.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    // ========================================================================
    // Record Registration
    // ========================================================================

    /// Register a record for the next commit.
    ///
    /// The first registration of an auto-increment record assigns its
    /// primary key, so the caller sees the key before the commit happens.
    /// An assigned key is like a burned sequence number: if the commit
    /// later fails, the key is not reused.
    ///
    /// Re-registering a record replaces its pending entry; registering a
    /// record whose state matches its last committed snapshot is a no-op.
    ///
    /// Overwriting the primary key of a tracked record moves its row: the
    /// next commit writes the row under the new key and frees the old
    /// one, instead of leaving two copies behind.
    #[tracing::instrument(level = "debug", skip(self, instance))]
    pub fn add(&mut self, instance: &mut Instance) -> Result<()> {
        let model_name = instance.model().name().to_string();
        {
            let registered = self.registry.resolve(&model_name)?;
            if !std::ptr::eq(registered.as_ref(), instance.model()) {
                return Err(Error::UnknownModel { name: model_name });
            }
        }

        let (pk_name, pk_auto) = match instance.model().primary_key() {
            Some(pk) => (pk.name.clone(), pk.auto_increment),
            None => {
                return Err(Error::NoPrimaryKey { model: model_name });
            }
        };

        if pk_auto && instance.get(&pk_name).is_none_or(Value::is_null) {
            let next = self.store.reserve_key(&model_name)?;
            instance.set(&pk_name, Value::BigInt(next))?;
            tracing::debug!(model = %model_name, key = next, "Assigned primary key");
        }

        let Some(key) = instance.key() else {
            let held = instance.get(&pk_name).cloned().unwrap_or(Value::Null);
            return Err(Error::InvalidKey {
                model: model_name,
                value: held.to_string(),
            });
        };
        let row_key = RowKey {
            model: model_name,
            key,
        };

        // A record already committed under another key is moving; remember
        // the key it vacates so commit relocates the row instead of
        // writing a second copy.
        let displaces = self
            .identity_map
            .iter()
            .find(|(tracked, identity)| {
                **identity == instance.identity()
                    && tracked.model == row_key.model
                    && tracked.key != row_key.key
            })
            .map(|(tracked, _)| tracked.key.clone());

        // One record holds one pending slot; a key change supersedes the
        // entry left under the old key.
        if let Some(stale) = self
            .pending
            .iter()
            .position(|row| row.instance.identity() == instance.identity() && row.row_key != row_key)
        {
            let removed = self.pending.remove(stale);
            self.pending_index.remove(&removed.row_key);
            for slot in self.pending_index.values_mut() {
                if *slot > stale {
                    *slot -= 1;
                }
            }
            tracing::debug!(
                model = %row_key.model,
                old_key = %removed.row_key.key,
                new_key = %row_key.key,
                "Superseding pending record after key change"
            );
        }

        // Snapshot comparison spots records that match their committed
        // state; a snapshot failure just disables the skip.
        let snapshot = serde_json::to_value(&*instance).ok();
        let unchanged = matches!(
            (&snapshot, self.clean.get(&row_key)),
            (Some(current), Some(prior)) if current == prior
        ) && self.identity_map.get(&row_key) == Some(&instance.identity());
        if unchanged {
            tracing::debug!(model = %row_key.model, key = %row_key.key, "Skipping unchanged record");
            return Ok(());
        }

        tracing::info!(model = %row_key.model, key = %row_key.key, "Adding record to session");

        if let Some(&i) = self.pending_index.get(&row_key) {
            if let Some(slot) = self.pending.get_mut(i) {
                slot.instance = instance.clone();
                slot.snapshot = snapshot;
                slot.displaces = displaces;
            }
        } else {
            self.pending_index.insert(row_key.clone(), self.pending.len());
            self.pending.push(PendingRow {
                row_key,
                instance: instance.clone(),
                snapshot,
                displaces,
            });
        }

        Ok(())
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Write all pending records to the store.
    ///
    /// The batch is checked as a whole before anything is written. On
    /// error the store is unchanged and the pending list is kept, so the
    /// session can be repaired and committed again.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            tracing::debug!("Nothing to commit");
            return Ok(());
        }

        tracing::info!(rows = self.pending.len(), "Starting commit");

        // A pending row keyed like an existing row must be an update of
        // that row. Anything else is a new record colliding with it.
        for row in &self.pending {
            if self.store.contains(&row.row_key.model, &row.row_key.key)
                && self.identity_map.get(&row.row_key) != Some(&row.instance.identity())
            {
                return Err(Error::DuplicateKey {
                    model: row.row_key.model.clone(),
                    key: row.row_key.key.clone(),
                });
            }
        }

        let batch: Vec<Write<'_>> = self
            .pending
            .iter()
            .map(|row| match &row.displaces {
                Some(old) => Write::Move(&row.instance, old.clone()),
                None => Write::Put(&row.instance),
            })
            .collect();
        self.store.apply(&batch)?;

        let applied = self.pending.len();
        for row in self.pending.drain(..) {
            if let Some(old) = row.displaces {
                let vacated = RowKey {
                    model: row.row_key.model.clone(),
                    key: old,
                };
                self.identity_map.remove(&vacated);
                self.clean.remove(&vacated);
            }
            self.identity_map
                .insert(row.row_key.clone(), row.instance.identity());
            if let Some(snapshot) = row.snapshot {
                self.clean.insert(row.row_key, snapshot);
            } else {
                self.clean.remove(&row.row_key);
            }
        }
        self.pending_index.clear();

        tracing::info!(rows = applied, "Commit applied");
        Ok(())
    }

    /// Discard every pending record without writing anything.
    ///
    /// Committed rows and their tracked identities are untouched. This is
    /// the way out after a failed commit when the offending record cannot
    /// be repaired.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) {
        tracing::info!(rows = self.pending.len(), "Rolling back pending records");
        self.pending.clear();
        self.pending_index.clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Start a query over one model's table.
    pub fn query(&self, model: &str) -> Result<Query<'_>> {
        let model = self.registry.resolve(model)?;
        Ok(Query::new(self, model.as_ref()))
    }

    // ========================================================================
    // Debug Diagnostics
    // ========================================================================

    /// Number of records waiting for the next commit.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of rows whose identity this session tracks.
    pub fn tracked_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Dump session state for debugging.
    pub fn debug_state(&self) -> SessionDebugInfo {
        SessionDebugInfo {
            pending: self.pending_count(),
            tracked: self.tracked_count(),
        }
    }
}

/// Debug information about session state.
#[derive(Debug, Clone)]
pub struct SessionDebugInfo {
    /// Records pending commit.
    pub pending: usize,
    /// Rows with tracked identity.
    pub tracked: usize,
}

// ============================================================================
// Unit Tests
// ============================================================================
