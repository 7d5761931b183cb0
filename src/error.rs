use std::fmt;

use crate::schema::AssociationKind;

pub type RecordResult<T> = Result<T, RecordError>;

/// Error type for record store and association operations.
///
/// A relation that simply resolves to nothing is not an error; accessors
/// return `None` for that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// No record type with this name has been defined on the store.
    UnknownType(String),
    /// The record type declares no association with this name.
    UnknownAssociation { kind: String, name: String },
    /// The association exists but has a different shape than the accessor asked for.
    AccessorMismatch {
        kind: String,
        name: String,
        association: AssociationKind,
    },
    /// Attribute is not part of the record type's schema.
    UnknownAttribute { kind: String, attribute: String },
    /// Declaring a type or association would clash with what already exists.
    DeclarationConflict { kind: String, name: String, reason: String },
    /// A record of the wrong type was handed to an association.
    TypeMismatch { expected: String, actual: String },
    /// The operation needs a record id that has not been assigned yet.
    UnassignedId(String),
    /// Loading data tried to replace an id that is already assigned.
    IdConflict {
        kind: String,
        current: String,
        requested: String,
    },
    /// A record with this id already exists in the store.
    DuplicateId { kind: String, id: String },
    /// Record not found.
    NotFound { kind: String, id: String },
    /// Nested data had a shape the association cannot resolve.
    InvalidPayload { kind: String, name: String, reason: String },
    /// Storage-level error.
    Storage(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::UnknownType(kind) => write!(f, "unknown record type: {}", kind),
            RecordError::UnknownAssociation { kind, name } => {
                write!(f, "record type {} has no association named {}", kind, name)
            }
            RecordError::AccessorMismatch {
                kind,
                name,
                association,
            } => write!(f, "{}.{} is a {} association", kind, name, association),
            RecordError::UnknownAttribute { kind, attribute } => {
                write!(f, "record type {} has no attribute named {}", kind, attribute)
            }
            RecordError::DeclarationConflict { kind, name, reason } => {
                write!(f, "cannot declare {} on {}: {}", name, kind, reason)
            }
            RecordError::TypeMismatch { expected, actual } => write!(
                f,
                "expected a {} record, got a {} record",
                expected, actual
            ),
            RecordError::UnassignedId(kind) => {
                write!(f, "{} record has no id assigned yet", kind)
            }
            RecordError::IdConflict {
                kind,
                current,
                requested,
            } => write!(
                f,
                "cannot change id of {}:{} to {}",
                kind, current, requested
            ),
            RecordError::DuplicateId { kind, id } => {
                write!(f, "record already exists: {}:{}", kind, id)
            }
            RecordError::NotFound { kind, id } => write!(f, "record not found: {}:{}", kind, id),
            RecordError::InvalidPayload { kind, name, reason } => {
                write!(f, "invalid nested data for {}.{}: {}", kind, name, reason)
            }
            RecordError::Storage(msg) => write!(f, "record storage error: {}", msg),
        }
    }
}

impl std::error::Error for RecordError {}
