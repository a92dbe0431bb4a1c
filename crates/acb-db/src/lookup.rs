//! Store-backed [`ReferenceLookup`].

use acb_core::error::AcbResult;
use acb_core::validation::{ReferenceLookup, VersionLink};
use acb_core::{Collection, DocId, VersionFamily};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::repository::row::{IdRow, parse_id, parse_optional_id};

#[derive(Debug, SurrealValue)]
struct LinkRow {
    master_id: String,
    previous_version_id: Option<String>,
}

/// Answers reference checks with one point read against SurrealDB per
/// call. Nothing is cached.
#[derive(Clone)]
pub struct SurrealReferenceLookup<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReferenceLookup<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ReferenceLookup for SurrealReferenceLookup<C> {
    async fn exists(&self, collection: Collection, id: &DocId) -> AcbResult<bool> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id FROM type::record($table, $id)")
            .bind(("table", collection.name()))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn version_link(
        &self,
        family: VersionFamily,
        id: &DocId,
    ) -> AcbResult<Option<VersionLink>> {
        let query = format!(
            "SELECT {} AS master_id, previous_version_id \
             FROM type::record($table, $id)",
            family.master_field()
        );
        let mut result = self
            .db
            .query(query)
            .bind(("table", family.versions().name()))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LinkRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(VersionLink {
            master_id: parse_id(&row.master_id)?,
            previous_version_id: parse_optional_id(row.previous_version_id)?,
        }))
    }
}
