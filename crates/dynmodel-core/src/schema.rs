//! Schema metadata for runtime-described models.
//!
//! Models are described at runtime as plain data: a [`ModelType`] holds a
//! list of [`FieldDef`]s and [`RelationDef`]s. Higher layers (registry,
//! session, store) consume this metadata to construct records, allocate
//! keys and enforce constraints without any compile-time knowledge of the
//! schema.

use crate::value::Value;

/// The storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
    /// Arbitrary JSON document.
    Json,
}

impl FieldType {
    /// Whether values of this type can address a row.
    ///
    /// Only integers and text hash and compare reliably, so only those can
    /// back a primary key.
    pub fn is_key_capable(self) -> bool {
        matches!(self, Self::BigInt | Self::Text)
    }

    /// Lowercase name, for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::BigInt => "bigint",
            Self::Double => "double",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Json => "json",
        }
    }
}

/// A field definition on a runtime-described model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Storage type.
    pub field_type: FieldType,
    /// Whether this is the primary key field.
    pub primary_key: bool,
    /// Whether the store assigns the key automatically.
    pub auto_increment: bool,
    /// Whether null is an acceptable value.
    pub nullable: bool,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Default value used when construction omits the field.
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create a new field definition.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            auto_increment: false,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    /// Mark as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as unique across the table.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// How many rows a relation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one related row. Assignment overwrites.
    SingleValued,
    /// Any number of related rows. Assignment appends if absent.
    MultiValued,
}

/// A named link from one model to another.
///
/// Relations carry keys, not embedded rows: a single-valued relation holds
/// an optional [`RecordKey`](crate::RecordKey), a multi-valued relation a
/// list of them. The referenced rows live in the target model's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name on the owning model.
    pub name: String,
    /// Name of the target model.
    pub target: String,
    /// Whether the relation holds one key or many.
    pub cardinality: Cardinality,
}

impl RelationDef {
    /// Create a single-valued relation: `Post.user -> User`.
    pub fn one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::SingleValued,
        }
    }

    /// Create a multi-valued relation: `User.posts -> [Post]`.
    pub fn many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::MultiValued,
        }
    }
}

/// A runtime-described model: a name plus field and relation definitions.
///
/// `ModelType` is plain metadata. It performs no validation on its own;
/// registering it with a [`ModelRegistry`](crate::ModelRegistry) checks
/// primary key shape, name collisions and relation targets.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelType {
    /// Model name, used for lookup.
    name: String,
    /// Field definitions in declaration order.
    fields: Vec<FieldDef>,
    /// Relation definitions in declaration order.
    relations: Vec<RelationDef>,
}

impl ModelType {
    /// Create a new model with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Add a field definition.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relation definition.
    #[must_use]
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Get relation definitions in declaration order.
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Look up a field by name.
    pub fn field_named(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a relation by name.
    pub fn relation_named(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Get the primary key field, if one is declared.
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }
}
