//! Field error accumulator.

use tracing::debug;

use crate::collection::Collection;
use crate::error::{AcbError, AcbResult, FieldError, FieldErrorKind, ValidationErrors};
use crate::id::DocId;
use crate::models::Payload;
use crate::validation::{ReferenceLookup, validate_reference};

/// Join a parent path and a field name (`access_config` + `access_type`).
pub fn field_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_owned()
    } else {
        format!("{parent}.{field}")
    }
}

/// Path of a list element (`users_access` + 2 -> `users_access[2]`).
pub fn indexed_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Validates one input against the store, collecting every field error
/// instead of stopping at the first.
///
/// Helpers return `None` for a field that failed; the failure is recorded
/// and surfaces from [`Validator::complete`]. Only store failures are
/// returned early, as `Err`.
pub struct Validator<'a, L> {
    lookup: &'a L,
    errors: Vec<FieldError>,
}

impl<'a, L: ReferenceLookup> Validator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            errors: Vec::new(),
        }
    }

    pub fn lookup(&self) -> &'a L {
        self.lookup
    }

    pub fn push(&mut self, field: impl Into<String>, kind: FieldErrorKind) {
        self.errors.push(FieldError::new(field, kind));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any error was recorded at `path` or below it.
    pub fn has_errors_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| {
            e.field == path
                || e.field
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }

    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, FieldErrorKind::MissingRequiredField);
        }
        value
    }

    /// Record `ImmutableField` when an update tries to set a field that is
    /// fixed after creation.
    pub fn reject_immutable<T>(&mut self, field: &str, value: &Option<T>) {
        if value.is_some() {
            self.push(field, FieldErrorKind::ImmutableField);
        }
    }

    /// Required string; blank counts as absent.
    pub fn require_text(&mut self, field: &str, value: String) -> Option<String> {
        if value.trim().is_empty() {
            self.push(field, FieldErrorKind::MissingRequiredField);
            None
        } else {
            Some(value)
        }
    }

    /// Optional string that must not be blank when supplied.
    pub fn non_blank(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value {
            Some(v) if v.trim().is_empty() => {
                self.push(
                    field,
                    FieldErrorKind::InvalidValue {
                        reason: "must not be blank".into(),
                    },
                );
                None
            }
            other => other,
        }
    }

    /// Required JSON object payload.
    pub fn require_payload(&mut self, field: &str, value: serde_json::Value) -> Option<Payload> {
        match value {
            serde_json::Value::Null => {
                self.push(field, FieldErrorKind::MissingRequiredField);
                None
            }
            other => self.payload(field, other),
        }
    }

    /// Optional JSON object payload; `None` and `null` both mean "absent".
    pub fn optional_payload(
        &mut self,
        field: &str,
        value: Option<serde_json::Value>,
    ) -> Option<Payload> {
        match value {
            None | Some(serde_json::Value::Null) => None,
            Some(other) => self.payload(field, other),
        }
    }

    fn payload(&mut self, field: &str, value: serde_json::Value) -> Option<Payload> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => {
                self.push(
                    field,
                    FieldErrorKind::InvalidValue {
                        reason: "expected a JSON object".into(),
                    },
                );
                None
            }
        }
    }

    /// Required reference. A blank value is reported as missing.
    pub async fn reference(
        &mut self,
        field: &str,
        collection: Collection,
        raw: &str,
    ) -> AcbResult<Option<DocId>> {
        if raw.trim().is_empty() {
            self.push(field, FieldErrorKind::MissingRequiredField);
            return Ok(None);
        }
        self.check_reference(field, collection, raw).await
    }

    /// Reference checked only when supplied.
    pub async fn optional_reference(
        &mut self,
        field: &str,
        collection: Collection,
        raw: Option<&str>,
    ) -> AcbResult<Option<DocId>> {
        match raw {
            Some(raw) => self.check_reference(field, collection, raw).await,
            None => Ok(None),
        }
    }

    /// Every element checked on its own, attributed as `field[i]`.
    /// Failed elements are left out of the result.
    pub async fn references(
        &mut self,
        field: &str,
        collection: Collection,
        raws: &[String],
    ) -> AcbResult<Vec<DocId>> {
        let mut ids = Vec::with_capacity(raws.len());
        for (i, raw) in raws.iter().enumerate() {
            let path = indexed_path(field, i);
            if let Some(id) = self.check_reference(&path, collection, raw).await? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn check_reference(
        &mut self,
        field: &str,
        collection: Collection,
        raw: &str,
    ) -> AcbResult<Option<DocId>> {
        match validate_reference(raw, collection, self.lookup).await {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                let kind = err.into_field_kind()?;
                debug!(field, %collection, error = %kind, "Reference rejected");
                self.push(field, kind);
                Ok(None)
            }
        }
    }

    /// Fail with every recorded error, or build the validated value.
    ///
    /// `build` sees only fields that passed; returning `None` from it
    /// without a recorded error is an internal bug, not a client error.
    pub fn complete<T>(self, build: impl FnOnce() -> Option<T>) -> AcbResult<T> {
        if let Some(errors) = ValidationErrors::from_vec(self.errors) {
            debug!(count = errors.len(), "Validation failed");
            return Err(AcbError::Validation(errors));
        }
        build().ok_or_else(|| AcbError::Internal("validated input lost a required value".into()))
    }
}
