//! Database-specific error types and conversions.

use acb_core::error::AcbError;

use crate::schema::unique_index;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate key: {entity}.{field} already holds {value}")]
    DuplicateKey {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Classify an error returned by a write. Unique index violations
    /// become [`DbError::DuplicateKey`]; everything else stays a store
    /// error.
    pub fn from_write(err: surrealdb::Error) -> Self {
        parse_index_violation(&err.to_string()).unwrap_or(DbError::Surreal(err))
    }
}

/// Recognizes "Database index `idx` already contains 'value', with record ...".
fn parse_index_violation(message: &str) -> Option<DbError> {
    let (_, rest) = message.split_once("index `")?;
    let (index, rest) = rest.split_once('`')?;
    let (_, rest) = rest.split_once("already contains ")?;
    let value = rest
        .split_once(", with record")
        .map_or(rest, |(value, _)| value);
    let (entity, field) = unique_index(index)?;

    Some(DbError::DuplicateKey {
        entity: entity.into(),
        field: field.into(),
        value: value.trim().trim_matches(['\'', '"', '[', ']']).to_owned(),
    })
}

impl From<DbError> for AcbError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AcbError::NotFound { entity, id },
            DbError::DuplicateKey {
                entity,
                field,
                value,
            } => AcbError::DuplicateKey {
                entity,
                field,
                value,
            },
            DbError::Decode(message) => AcbError::Internal(message),
            other => AcbError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_violation_becomes_duplicate_key() {
        let message = "Database index `idx_roles_role_name` already contains 'editor', \
                       with record `roles:650d5a32c74d081f9b36d654`";
        match parse_index_violation(message) {
            Some(DbError::DuplicateKey {
                entity,
                field,
                value,
            }) => {
                assert_eq!(entity, "roles");
                assert_eq!(field, "role_name");
                assert_eq!(value, "editor");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bracketed_values_are_unwrapped() {
        let message = "Database index `idx_users_ext_id` already contains ['auth0|1'], \
                       with record `users:x`";
        assert!(matches!(
            parse_index_violation(message),
            Some(DbError::DuplicateKey { value, .. }) if value == "auth0|1"
        ));
    }

    #[test]
    fn other_messages_are_not_duplicates() {
        assert!(parse_index_violation("Found NONE for field `ext_id`").is_none());
        assert!(
            parse_index_violation("Database index `idx_unknown` already contains 'x'").is_none()
        );
    }

    #[test]
    fn conversion_keeps_duplicate_key_structured() {
        let err: AcbError = DbError::DuplicateKey {
            entity: "groups".into(),
            field: "group_name".into(),
            value: "newsroom".into(),
        }
        .into();
        assert!(matches!(err, AcbError::DuplicateKey { .. }));
    }
}
