//! SurrealDB implementation of [`VisualResourceRepository`].

use acb_core::DocId;
use acb_core::error::AcbResult;
use acb_core::models::visual_resource::{FileType, ResourceStatus, VisualResource};
use acb_core::repository::{PaginatedResult, Pagination, VisualResourceRepository};
use acb_core::schemas::visual_resource::{CreateVisualResource, UpdateVisualResource};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    access_config, allowed_groups, audit_log, count_all, delete_record, from_json, parse_enum,
    parse_id, single, to_json, write_failed,
};

const TABLE: &str = "visual_resources";

#[derive(Debug, SurrealValue)]
struct VisualResourceRow {
    record_id: String,
    file_url: String,
    file_name: String,
    file_type: String,
    status: String,
    tags: serde_json::Value,
    access_type: String,
    allowed_groups: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl VisualResourceRow {
    fn try_into_resource(self) -> Result<VisualResource, DbError> {
        Ok(VisualResource {
            id: parse_id(&self.record_id)?,
            file_url: self.file_url,
            file_name: self.file_name,
            file_type: parse_enum::<FileType>(&self.file_type)?,
            status: parse_enum::<ResourceStatus>(&self.status)?,
            tags: from_json(self.tags, "tags")?,
            access_config: access_config(&self.access_type, self.allowed_groups)?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the VisualResource repository.
#[derive(Clone)]
pub struct SurrealVisualResourceRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealVisualResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> VisualResourceRepository for SurrealVisualResourceRepository<C> {
    async fn create(&self, input: CreateVisualResource) -> AcbResult<VisualResource> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('visual_resources', $id) SET \
                 file_url = $file_url, file_name = $file_name, \
                 file_type = $file_type, status = $status, tags = $tags, \
                 access_type = $access_type, allowed_groups = $allowed_groups, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('visual_resources', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("file_url", new.file_url))
            .bind(("file_name", new.file_name))
            .bind(("file_type", new.file_type.as_str()))
            .bind(("status", new.status.as_str()))
            .bind(("tags", to_json(&new.tags, "tags")?))
            .bind(("access_type", new.access_config.access_type.as_str()))
            .bind(("allowed_groups", allowed_groups(&new.access_config)?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<VisualResourceRow> = result.take(1).map_err(DbError::from)?;
        let resource = single(rows, TABLE, &id_str)?.try_into_resource()?;
        debug!(
            id = %resource.id,
            file_name = %resource.file_name,
            file_type = %resource.file_type,
            "Visual resource created"
        );
        Ok(resource)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<VisualResource> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('visual_resources', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VisualResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_resource()?)
    }

    async fn update(&self, id: &DocId, input: UpdateVisualResource) -> AcbResult<VisualResource> {
        let stored = self.get_by_id(id).await?;
        let patch = input.validate(&stored, &self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.file_name.is_some() {
            sets.push("file_name = $file_name");
        }
        if patch.file_type.is_some() {
            sets.push("file_type = $file_type");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.tags.is_some() {
            sets.push("tags = $tags");
        }
        if patch.access_config.is_some() {
            sets.push("access_type = $access_type");
            sets.push("allowed_groups = $allowed_groups");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('visual_resources', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('visual_resources', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(file_name) = patch.file_name {
            builder = builder.bind(("file_name", file_name));
        }
        if let Some(file_type) = patch.file_type {
            builder = builder.bind(("file_type", file_type.as_str()));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(tags) = &patch.tags {
            builder = builder.bind(("tags", to_json(tags, "tags")?));
        }
        if let Some(access) = &patch.access_config {
            builder = builder
                .bind(("access_type", access.access_type.as_str()))
                .bind(("allowed_groups", allowed_groups(access)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<VisualResourceRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_resource()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "Visual resource deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> AcbResult<PaginatedResult<VisualResource>> {
        let total = count_all(&self.db, TABLE).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM visual_resources \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VisualResourceRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(VisualResourceRow::try_into_resource)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_tag(&self, tag: &str) -> AcbResult<Vec<VisualResource>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM visual_resources \
                 WHERE tags CONTAINS $tag \
                 ORDER BY created_at ASC",
            )
            .bind(("tag", tag.trim().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VisualResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(VisualResourceRow::try_into_resource)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
