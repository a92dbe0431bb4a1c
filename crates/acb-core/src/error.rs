//! Error types for the ACB data-access layer.

use std::fmt;

use thiserror::Error;

use crate::collection::Collection;
use crate::id::DocId;

#[derive(Debug, Error)]
pub enum AcbError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate key: {entity}.{field} already holds {value}")]
    DuplicateKey {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AcbError {
    /// Field errors carried by a validation failure, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AcbError::Validation(errors) => errors.as_slice(),
            _ => &[],
        }
    }
}

pub type AcbResult<T> = Result<T, AcbError>;

/// What went wrong with a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("invalid identifier format: '{value}'")]
    MalformedIdentifier { value: String },

    #[error("referenced {collection} record '{id}' does not exist")]
    DanglingReference { collection: Collection, id: DocId },

    #[error("invalid access configuration: {reason}")]
    InvalidAccessConfig { reason: String },

    #[error("invalid target element: {reason}")]
    InvalidTargetElement { reason: String },

    #[error("field is required")]
    MissingRequiredField,

    #[error("field cannot be changed once the version is committed")]
    ImmutableField,

    #[error("version '{version}' does not belong to master '{master}'")]
    VersionMismatch { version: DocId, master: DocId },

    #[error("comment thread deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

/// A validation failure attributed to one input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {kind}")]
pub struct FieldError {
    /// Dotted path to the field, with list indices (`users_access[0].user_id`).
    pub field: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Every field error found while validating one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Returns `None` when there is nothing to report.
    pub fn from_vec(errors: Vec<FieldError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn single(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self(vec![FieldError::new(field, kind)])
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first error reported for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&FieldErrorKind> {
        self.0.iter().find(|e| e.field == field).map(|e| &e.kind)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl From<ValidationErrors> for AcbError {
    fn from(errors: ValidationErrors) -> Self {
        AcbError::Validation(errors)
    }
}
