//! Error types for DynModel.
//!
//! Every fallible operation in the ecosystem returns [`Error`]. The variants
//! fall into four broad groups that callers can match on:
//!
//! - **Lookup**: a name did not resolve (`UnknownModel`, `UnknownField`,
//!   `UnknownRelation`).
//! - **Construction**: a record could not be built from the given values
//!   (`RelationField`, `NoPrimaryKey`).
//! - **Ambiguity**: a query expected at most one row (`MultipleRows`).
//! - **Persistence**: the store rejected a commit (`DuplicateKey`,
//!   `UniqueViolation`, `NotNull`, `ForeignKey`, `InvalidKey`, `MissingKey`,
//!   `SequenceExhausted`).
//!
//! Registry construction has its own small group (`DuplicateModel`,
//! `DuplicateField`, `MultiplePrimaryKeys`, `KeyType`, `UnknownTarget`).

use std::fmt;

use crate::value::{RecordKey, Value};

/// Result type alias using the DynModel error.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by registries, sessions, queries and stores.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No model with this name is registered.
    UnknownModel {
        /// The name that failed to resolve.
        name: String,
    },

    /// The model has no field with this name.
    UnknownField {
        /// Model name.
        model: String,
        /// The field name that failed to resolve.
        field: String,
    },

    /// The model has no relation with this name.
    UnknownRelation {
        /// Model name.
        model: String,
        /// The relation name that failed to resolve.
        field: String,
    },

    /// A relation name was supplied where a field value was expected.
    RelationField {
        /// Model name.
        model: String,
        /// The offending relation name.
        field: String,
    },

    /// A query expected zero or one row but matched several.
    MultipleRows {
        /// Model name.
        model: String,
        /// How many rows matched.
        found: usize,
    },

    /// An insert would reuse a primary key already present in the table.
    DuplicateKey {
        /// Model name.
        model: String,
        /// The conflicting key.
        key: RecordKey,
    },

    /// A unique field would hold the same value as another row.
    UniqueViolation {
        /// Model name.
        model: String,
        /// The unique field.
        field: String,
        /// The duplicated value.
        value: Value,
    },

    /// A non-nullable field holds null at commit time.
    NotNull {
        /// Model name.
        model: String,
        /// The field holding null.
        field: String,
    },

    /// A relation references a key with no row in the target table.
    ForeignKey {
        /// Model name on the referencing side.
        model: String,
        /// Relation name on the referencing side.
        relation: String,
        /// Target model name.
        target: String,
        /// The dangling key.
        key: RecordKey,
    },

    /// The primary key value cannot address a row.
    InvalidKey {
        /// Model name.
        model: String,
        /// Display form of the offending value.
        value: String,
    },

    /// The instance has no primary key value yet.
    MissingKey {
        /// Model name.
        model: String,
    },

    /// The auto-increment sequence for a model has no keys left.
    SequenceExhausted {
        /// Model name.
        model: String,
    },

    /// Two models with the same name were registered.
    DuplicateModel {
        /// The duplicated model name.
        name: String,
    },

    /// A model declares two fields or relations with the same name.
    DuplicateField {
        /// Model name.
        model: String,
        /// The duplicated name.
        field: String,
    },

    /// A model declares no primary key field.
    NoPrimaryKey {
        /// Model name.
        model: String,
    },

    /// A model declares more than one primary key field.
    MultiplePrimaryKeys {
        /// Model name.
        model: String,
    },

    /// A key or auto-increment field has a type that cannot act as a key.
    KeyType {
        /// Model name.
        model: String,
        /// The offending field.
        field: String,
    },

    /// A relation targets a model name that is not registered.
    UnknownTarget {
        /// Model name on the referencing side.
        model: String,
        /// Relation name on the referencing side.
        relation: String,
        /// The unresolved target name.
        target: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModel { name } => {
                write!(f, "Unknown model `{name}`")
            }
            Self::UnknownField { model, field } => {
                write!(f, "Unknown field `{field}` for model `{model}`")
            }
            Self::UnknownRelation { model, field } => {
                write!(f, "Unknown relation `{field}` for model `{model}`")
            }
            Self::RelationField { model, field } => {
                write!(
                    f,
                    "Relation `{field}` of model `{model}` cannot be set as a field value"
                )
            }
            Self::MultipleRows { model, found } => {
                write!(f, "Expected zero or one `{model}` row, found {found}")
            }
            Self::DuplicateKey { model, key } => {
                write!(f, "Duplicate primary key `{key}` for model `{model}`")
            }
            Self::UniqueViolation {
                model,
                field,
                value,
            } => {
                write!(
                    f,
                    "Duplicate value `{value}` for unique field `{model}.{field}`"
                )
            }
            Self::NotNull { model, field } => {
                write!(f, "Field `{model}.{field}` must not be null")
            }
            Self::ForeignKey {
                model,
                relation,
                target,
                key,
            } => {
                write!(
                    f,
                    "Relation `{model}.{relation}` references a missing `{target}` row with key `{key}`"
                )
            }
            Self::InvalidKey { model, value } => {
                write!(
                    f,
                    "Primary key value `{value}` is not valid for model `{model}`"
                )
            }
            Self::MissingKey { model } => {
                write!(f, "Instance of model `{model}` has no primary key value")
            }
            Self::SequenceExhausted { model } => {
                write!(
                    f,
                    "Auto-increment sequence for model `{model}` is exhausted"
                )
            }
            Self::DuplicateModel { name } => {
                write!(f, "Model `{name}` is already registered")
            }
            Self::DuplicateField { model, field } => {
                write!(
                    f,
                    "Duplicate field or relation name `{field}` in model `{model}`"
                )
            }
            Self::NoPrimaryKey { model } => {
                write!(f, "Model `{model}` has no primary key field")
            }
            Self::MultiplePrimaryKeys { model } => {
                write!(f, "Model `{model}` declares more than one primary key field")
            }
            Self::KeyType { model, field } => {
                write!(
                    f,
                    "Field `{model}.{field}` has a type that cannot serve as a record key"
                )
            }
            Self::UnknownTarget {
                model,
                relation,
                target,
            } => {
                write!(
                    f,
                    "Relation `{model}.{relation}` targets unregistered model `{target}`"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
