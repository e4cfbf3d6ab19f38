//! Explicit model registry.
//!
//! The registry is the single authority for resolving model names. Every
//! model a program works with is registered up front; an operation naming
//! an unregistered model fails with [`Error::UnknownModel`] instead of
//! silently probing some ambient namespace.
//!
//! Registration validates model shape once, so downstream layers can rely
//! on it: every registered model has exactly one key-capable primary key,
//! no colliding field or relation names, and no dangling relation targets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::{FieldType, ModelType};

/// An immutable set of registered models, indexed by name.
///
/// Build one with [`ModelRegistry::builder`], then share it behind an
/// `Arc` with every session that works against the same schema.
#[derive(Debug)]
pub struct ModelRegistry {
    /// Registered models by name.
    models: HashMap<String, Arc<ModelType>>,
    /// Names in registration order.
    order: Vec<String>,
}

impl ModelRegistry {
    /// Start building a registry.
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder { models: Vec::new() }
    }

    /// Resolve a model name.
    pub fn resolve(&self, name: &str) -> Result<&Arc<ModelType>> {
        self.models.get(name).ok_or_else(|| Error::UnknownModel {
            name: name.to_string(),
        })
    }

    /// Whether a model with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate over models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelType>> {
        self.order.iter().filter_map(|name| self.models.get(name))
    }
}

/// Builder for [`ModelRegistry`].
#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    models: Vec<ModelType>,
}

impl ModelRegistryBuilder {
    /// Add a model to the registry.
    #[must_use]
    pub fn model(mut self, model: ModelType) -> Self {
        self.models.push(model);
        self
    }

    /// Validate all models and build the registry.
    ///
    /// Checks, per model: unique name, one key-capable primary key,
    /// no duplicate field or relation names, auto-increment only on an
    /// integer primary key. Relation targets are checked against the full
    /// model set, so forward and self references are fine.
    pub fn build(self) -> Result<ModelRegistry> {
        let mut seen: HashSet<&str> = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name()) {
                return Err(Error::DuplicateModel {
                    name: model.name().to_string(),
                });
            }
            check_shape(model)?;
        }

        for model in &self.models {
            for relation in model.relations() {
                if !seen.contains(relation.target.as_str()) {
                    return Err(Error::UnknownTarget {
                        model: model.name().to_string(),
                        relation: relation.name.clone(),
                        target: relation.target.clone(),
                    });
                }
            }
        }

        let mut models = HashMap::with_capacity(self.models.len());
        let mut order = Vec::with_capacity(self.models.len());
        for model in self.models {
            tracing::debug!(
                model = model.name(),
                fields = model.fields().len(),
                relations = model.relations().len(),
                "Registered model"
            );
            order.push(model.name().to_string());
            models.insert(model.name().to_string(), Arc::new(model));
        }

        Ok(ModelRegistry { models, order })
    }
}

/// Validate a single model's shape.
fn check_shape(model: &ModelType) -> Result<()> {
    // Fields and relations share one namespace on the record.
    let mut names: HashSet<&str> = HashSet::new();
    for field in model.fields() {
        if !names.insert(field.name.as_str()) {
            return Err(Error::DuplicateField {
                model: model.name().to_string(),
                field: field.name.clone(),
            });
        }
    }
    for relation in model.relations() {
        if !names.insert(relation.name.as_str()) {
            return Err(Error::DuplicateField {
                model: model.name().to_string(),
                field: relation.name.clone(),
            });
        }
    }

    let pk_count = model.fields().iter().filter(|f| f.primary_key).count();
    if pk_count == 0 {
        return Err(Error::NoPrimaryKey {
            model: model.name().to_string(),
        });
    }
    if pk_count > 1 {
        return Err(Error::MultiplePrimaryKeys {
            model: model.name().to_string(),
        });
    }

    if let Some(pk) = model.primary_key() {
        if !pk.field_type.is_key_capable() {
            return Err(Error::KeyType {
                model: model.name().to_string(),
                field: pk.name.clone(),
            });
        }
    }

    // Key assignment only makes sense for an integer primary key.
    for field in model.fields() {
        if field.auto_increment && !(field.primary_key && field.field_type == FieldType::BigInt) {
            return Err(Error::KeyType {
                model: model.name().to_string(),
                field: field.name.clone(),
            });
        }
    }

    Ok(())
}
