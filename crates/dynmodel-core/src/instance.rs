//! Record instances.
//!
//! An [`Instance`] is one row's worth of data bound to its model type:
//! field values, relation keys, and a stable identity. Construction is
//! checked against the model (unknown names and relation names are
//! rejected up front, declared fields are backfilled from defaults), so a
//! built instance always carries a value slot for every declared field and
//! a relation slot for every declared relation.
//!
//! Cloning an instance clones its data but keeps its [`InstanceId`]. Two
//! clones are two handles on the same logical row, the way two variables
//! can reference one object in a garbage-collected language. Sessions use
//! the identity to tell "update of a row I know" from "new row colliding
//! with an existing key".

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::schema::{Cardinality, ModelType};
use crate::value::{RecordKey, Value};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a logical row, preserved across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The keys held by one relation slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationValue {
    /// Single-valued relation: at most one key.
    One(Option<RecordKey>),
    /// Multi-valued relation: any number of keys, in attachment order.
    Many(Vec<RecordKey>),
}

impl RelationValue {
    /// The empty slot for a given cardinality.
    pub fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::SingleValued => Self::One(None),
            Cardinality::MultiValued => Self::Many(Vec::new()),
        }
    }

    /// The keys currently held, regardless of cardinality.
    pub fn keys(&self) -> &[RecordKey] {
        match self {
            Self::One(key) => key.as_slice(),
            Self::Many(keys) => keys,
        }
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether no key is held.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

fn serialize_model_name<S: Serializer>(
    model: &Arc<ModelType>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(model.name())
}

/// A single record of a runtime-described model.
///
/// Instances serialize with serde: the model name, field values and
/// relation keys are emitted; identity is not, so two instances holding
/// the same data serialize identically.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    /// The model this record belongs to.
    #[serde(serialize_with = "serialize_model_name")]
    model: Arc<ModelType>,
    /// Name of the primary key field, cached from the model.
    #[serde(skip)]
    pk_field: String,
    /// Identity shared by all clones of this record.
    #[serde(skip)]
    identity: InstanceId,
    /// Current value of every declared field.
    values: HashMap<String, Value>,
    /// Current keys of every declared relation.
    relations: HashMap<String, RelationValue>,
}

impl Instance {
    /// Build a record from field values.
    ///
    /// Every declared field gets a slot: provided values win, then field
    /// defaults, then `Null`. Relations start empty and can only be
    /// populated through [`relate_key`](Self::relate_key).
    ///
    /// Fails with [`Error::UnknownField`] if a name matches no field, and
    /// with [`Error::RelationField`] if it names a relation, since
    /// relations hold keys rather than field values.
    pub fn new(model: &Arc<ModelType>, values: Vec<(String, Value)>) -> Result<Self> {
        let Some(pk) = model.primary_key() else {
            return Err(Error::NoPrimaryKey {
                model: model.name().to_string(),
            });
        };

        let mut instance = Self {
            pk_field: pk.name.clone(),
            identity: InstanceId::next(),
            values: model
                .fields()
                .iter()
                .map(|f| (f.name.clone(), f.default.clone().unwrap_or(Value::Null)))
                .collect(),
            relations: model
                .relations()
                .iter()
                .map(|r| (r.name.clone(), RelationValue::empty(r.cardinality)))
                .collect(),
            model: Arc::clone(model),
        };

        for (field, value) in values {
            instance.set(&field, value)?;
        }

        Ok(instance)
    }

    /// The model this record belongs to.
    pub fn model(&self) -> &ModelType {
        &self.model
    }

    /// Name of the primary key field.
    pub fn primary_key_field(&self) -> &str {
        &self.pk_field
    }

    /// Identity shared by all clones of this record.
    pub fn identity(&self) -> InstanceId {
        self.identity
    }

    /// The primary key, if the key field holds a key-capable value.
    pub fn key(&self) -> Option<RecordKey> {
        self.values.get(&self.pk_field).and_then(RecordKey::from_value)
    }

    /// Get a field value. `None` if the model has no such field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Overwrite a field value.
    ///
    /// The same name checks as [`new`](Self::new) apply.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if self.model.field_named(field).is_some() {
            self.values.insert(field.to_string(), value.into());
            Ok(())
        } else if self.model.relation_named(field).is_some() {
            Err(Error::RelationField {
                model: self.model.name().to_string(),
                field: field.to_string(),
            })
        } else {
            Err(Error::UnknownField {
                model: self.model.name().to_string(),
                field: field.to_string(),
            })
        }
    }

    /// All field values.
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Get a relation slot. `None` if the model has no such relation.
    pub fn relation(&self, relation: &str) -> Option<&RelationValue> {
        self.relations.get(relation)
    }

    /// All relation slots.
    pub fn relations(&self) -> &HashMap<String, RelationValue> {
        &self.relations
    }

    /// Attach a key to a relation.
    ///
    /// Single-valued relations are overwritten; multi-valued relations
    /// append unless the key is already attached. Returns whether the
    /// slot changed.
    pub fn relate_key(&mut self, relation: &str, key: RecordKey) -> Result<bool> {
        let Some(def) = self.model.relation_named(relation) else {
            return Err(Error::UnknownRelation {
                model: self.model.name().to_string(),
                field: relation.to_string(),
            });
        };
        let cardinality = def.cardinality;

        let slot = self
            .relations
            .entry(relation.to_string())
            .or_insert_with(|| RelationValue::empty(cardinality));

        match slot {
            RelationValue::One(current) => {
                let changed = current.as_ref() != Some(&key);
                *current = Some(key);
                Ok(changed)
            }
            RelationValue::Many(keys) => {
                if keys.contains(&key) {
                    Ok(false)
                } else {
                    keys.push(key);
                    Ok(true)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, RelationDef};

    fn user_model() -> Arc<ModelType> {
        Arc::new(
            ModelType::new("User")
                .field(
                    FieldDef::new("id", FieldType::BigInt)
                        .primary_key()
                        .auto_increment(),
                )
                .field(FieldDef::new("name", FieldType::Text))
                .field(
                    FieldDef::new("age", FieldType::BigInt)
                        .nullable()
                        .with_default(0),
                )
                .relation(RelationDef::many("posts", "Post"))
                .relation(RelationDef::one("avatar", "Image")),
        )
    }

    #[test]
    fn test_new_backfills_defaults_and_null() {
        let model = user_model();
        let user = Instance::new(
            &model,
            vec![("name".to_string(), Value::Text("Peter".to_string()))],
        )
        .unwrap();

        assert_eq!(user.get("name").and_then(Value::as_str), Some("Peter"));
        assert_eq!(user.get("age"), Some(&Value::BigInt(0)));
        assert_eq!(user.get("id"), Some(&Value::Null));
        assert!(user.key().is_none());
    }

    #[test]
    fn test_new_seeds_empty_relations() {
        let model = user_model();
        let user = Instance::new(&model, vec![]).unwrap();

        assert_eq!(user.relation("posts"), Some(&RelationValue::Many(vec![])));
        assert_eq!(user.relation("avatar"), Some(&RelationValue::One(None)));
        assert!(user.relation("nonexistent").is_none());
    }

    #[test]
    fn test_new_rejects_unknown_field() {
        let model = user_model();
        let err = Instance::new(
            &model,
            vec![("handle".to_string(), Value::Text("p".to_string()))],
        )
        .unwrap_err();

        assert_eq!(
            err,
            Error::UnknownField {
                model: "User".to_string(),
                field: "handle".to_string()
            }
        );
    }

    #[test]
    fn test_new_rejects_relation_as_field_value() {
        let model = user_model();
        let err = Instance::new(&model, vec![("posts".to_string(), Value::BigInt(1))]).unwrap_err();

        assert_eq!(
            err,
            Error::RelationField {
                model: "User".to_string(),
                field: "posts".to_string()
            }
        );
    }

    #[test]
    fn test_new_requires_primary_key_field() {
        let model = Arc::new(ModelType::new("Note").field(FieldDef::new("body", FieldType::Text)));
        let err = Instance::new(&model, vec![]).unwrap_err();
        assert!(matches!(err, Error::NoPrimaryKey { .. }));
    }

    #[test]
    fn test_key_from_explicit_value() {
        let model = user_model();
        let mut user = Instance::new(&model, vec![]).unwrap();
        user.set("id", 42).unwrap();
        assert_eq!(user.key(), Some(RecordKey::Int(42)));
    }

    #[test]
    fn test_set_checks_names() {
        let model = user_model();
        let mut user = Instance::new(&model, vec![]).unwrap();

        assert!(user.set("name", "Peter").is_ok());
        assert!(matches!(
            user.set("posts", 1).unwrap_err(),
            Error::RelationField { .. }
        ));
        assert!(matches!(
            user.set("handle", "p").unwrap_err(),
            Error::UnknownField { .. }
        ));
    }

    #[test]
    fn test_relate_key_many_appends_once() {
        let model = user_model();
        let mut user = Instance::new(&model, vec![]).unwrap();

        assert!(user.relate_key("posts", RecordKey::Int(1)).unwrap());
        assert!(user.relate_key("posts", RecordKey::Int(2)).unwrap());
        assert!(!user.relate_key("posts", RecordKey::Int(1)).unwrap());

        let slot = user.relation("posts").unwrap();
        assert_eq!(slot.keys(), &[RecordKey::Int(1), RecordKey::Int(2)]);
    }

    #[test]
    fn test_relate_key_one_overwrites() {
        let model = user_model();
        let mut user = Instance::new(&model, vec![]).unwrap();

        assert!(user.relate_key("avatar", RecordKey::Int(1)).unwrap());
        assert!(user.relate_key("avatar", RecordKey::Int(2)).unwrap());
        assert!(!user.relate_key("avatar", RecordKey::Int(2)).unwrap());

        assert_eq!(
            user.relation("avatar"),
            Some(&RelationValue::One(Some(RecordKey::Int(2))))
        );
    }

    #[test]
    fn test_relate_key_unknown_relation() {
        let model = user_model();
        let mut user = Instance::new(&model, vec![]).unwrap();
        let err = user.relate_key("friends", RecordKey::Int(1)).unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { .. }));
    }

    #[test]
    fn test_clone_shares_identity() {
        let model = user_model();
        let user = Instance::new(&model, vec![]).unwrap();
        let other = Instance::new(&model, vec![]).unwrap();

        assert_eq!(user.clone().identity(), user.identity());
        assert_ne!(user.identity(), other.identity());
    }

    #[test]
    fn test_serialization_shape() {
        let model = user_model();
        let mut user = Instance::new(
            &model,
            vec![("name".to_string(), Value::Text("Peter".to_string()))],
        )
        .unwrap();
        user.relate_key("posts", RecordKey::Int(7)).unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["model"], "User");
        assert!(json["values"]["name"].is_object());
        assert!(json.get("identity").is_none());
        assert!(json.get("pk_field").is_none());
    }

    #[test]
    fn test_clones_with_same_data_serialize_identically() {
        let model = user_model();
        let user = Instance::new(
            &model,
            vec![("name".to_string(), Value::Text("Peter".to_string()))],
        )
        .unwrap();
        let twin = user.clone();

        let a = serde_json::to_value(&user).unwrap();
        let b = serde_json::to_value(&twin).unwrap();
        assert_eq!(a, b);
    }
}
