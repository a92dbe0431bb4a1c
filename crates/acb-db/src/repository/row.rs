//! Row decoding shared by the repositories.
//!
//! Rows carry identifiers and enums as strings and embedded lists or
//! objects as JSON; the helpers here turn them back into domain types.
//! A stored value that does not decode is a [`DbError::Decode`].

use std::str::FromStr;

use acb_core::DocId;
use acb_core::models::access::{AccessConfig, AccessType};
use acb_core::models::Payload;
use acb_core::models::audit::AuditLog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(crate) struct IdRow {
    #[allow(dead_code)]
    pub record_id: String,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_id(raw: &str) -> Result<DocId, DbError> {
    DocId::parse(raw).map_err(|e| DbError::Decode(e.to_string()))
}

pub(crate) fn parse_optional_id(raw: Option<String>) -> Result<Option<DocId>, DbError> {
    raw.as_deref().map(parse_id).transpose()
}

pub(crate) fn parse_enum<T: FromStr<Err = String>>(raw: &str) -> Result<T, DbError> {
    raw.parse().map_err(DbError::Decode)
}

pub(crate) fn from_json<T: DeserializeOwned>(
    value: serde_json::Value,
    field: &str,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("{field}: {e}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T, field: &str) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::Decode(format!("{field}: {e}")))
}

pub(crate) fn id_strings(ids: &[DocId]) -> Vec<String> {
    ids.iter().map(DocId::to_string).collect()
}

pub(crate) fn audit_log(
    created_at: DateTime<Utc>,
    creator_id: &str,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
) -> Result<AuditLog, DbError> {
    Ok(AuditLog {
        created_at,
        creator_id: parse_id(creator_id)?,
        updated_at,
        updater_id: parse_optional_id(updater_id)?,
    })
}

pub(crate) fn access_config(
    access_type: &str,
    allowed_groups: serde_json::Value,
) -> Result<AccessConfig, DbError> {
    Ok(AccessConfig {
        access_type: parse_enum::<AccessType>(access_type)?,
        allowed_groups: from_json(allowed_groups, "allowed_groups")?,
    })
}

pub(crate) fn allowed_groups(access: &AccessConfig) -> Result<serde_json::Value, DbError> {
    to_json(&access.allowed_groups, "allowed_groups")
}

pub(crate) fn payload(value: serde_json::Value, field: &str) -> Result<Payload, DbError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(DbError::Decode(format!("{field}: expected object, got {other}"))),
    }
}

/// Map a failed write, logging duplicate-key rejections.
pub(crate) fn write_failed(err: surrealdb::Error) -> DbError {
    let err = DbError::from_write(err);
    if let DbError::DuplicateKey {
        entity,
        field,
        value,
    } = &err
    {
        warn!(%entity, %field, %value, "Duplicate key rejected");
    }
    err
}

/// First row of a result, or `NotFound`.
pub(crate) fn single<T>(rows: Vec<T>, entity: &str, id: &str) -> Result<T, DbError> {
    rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: entity.into(),
        id: id.into(),
    })
}

/// Delete one record, failing with `NotFound` if it was not there.
pub(crate) async fn delete_record<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: &DocId,
) -> Result<(), DbError> {
    let mut result = db
        .query("DELETE type::record($table, $id) RETURN BEFORE")
        .bind(("table", table))
        .bind(("id", id.to_string()))
        .await?;
    let rows: Vec<surrealdb_types::Value> = result.take(0)?;
    if rows.is_empty() {
        return Err(DbError::NotFound {
            entity: table.into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub(crate) async fn count_all<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
) -> Result<u64, DbError> {
    let mut result = db
        .query("SELECT count() AS total FROM type::table($table) GROUP ALL")
        .bind(("table", table))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(rows.first().map(|r| r.total).unwrap_or(0))
}

/// Count the records of `table` whose `field` equals `value`.
pub(crate) async fn count_where<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    field: &'static str,
    value: String,
) -> Result<u64, DbError> {
    let query = format!(
        "SELECT count() AS total FROM type::table($table) \
         WHERE {field} = $value GROUP ALL"
    );
    let mut result = db
        .query(query)
        .bind(("table", table))
        .bind(("value", value))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(rows.first().map(|r| r.total).unwrap_or(0))
}
