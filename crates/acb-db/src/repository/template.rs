//! SurrealDB implementation of [`TemplateRepository`].

use acb_core::error::{AcbError, AcbResult};
use acb_core::models::template::{TemplateMaster, TemplateStatus, TemplateVersion};
use acb_core::repository::{PaginatedResult, Pagination, TemplateRepository};
use acb_core::schemas::template::{
    CreateTemplateMaster, CreateTemplateVersion, UpdateTemplateMaster, UpdateTemplateVersion,
};
use acb_core::validation::chain::version_chain;
use acb_core::{DocId, VersionFamily};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    access_config, allowed_groups, audit_log, count_all, count_where, parse_enum, parse_id,
    parse_optional_id, payload, single, write_failed,
};

const MASTERS: &str = "templates_master";
const VERSIONS: &str = "templates_versions";

#[derive(Debug, SurrealValue)]
struct MasterRow {
    record_id: String,
    template_name: String,
    description: Option<String>,
    status: String,
    current_version_id: Option<String>,
    access_type: String,
    allowed_groups: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl MasterRow {
    fn try_into_master(self) -> Result<TemplateMaster, DbError> {
        Ok(TemplateMaster {
            id: parse_id(&self.record_id)?,
            template_name: self.template_name,
            description: self.description,
            status: parse_enum::<TemplateStatus>(&self.status)?,
            current_version_id: parse_optional_id(self.current_version_id)?,
            access_config: access_config(&self.access_type, self.allowed_groups)?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct VersionRow {
    record_id: String,
    template_master_id: String,
    previous_version_id: Option<String>,
    version_num: String,
    commit_message: String,
    content: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl VersionRow {
    fn try_into_version(self) -> Result<TemplateVersion, DbError> {
        Ok(TemplateVersion {
            id: parse_id(&self.record_id)?,
            template_master_id: parse_id(&self.template_master_id)?,
            previous_version_id: parse_optional_id(self.previous_version_id)?,
            version_num: self.version_num,
            commit_message: self.commit_message,
            content: payload(self.content, "content")?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the Template repository.
#[derive(Clone)]
pub struct SurrealTemplateRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealTemplateRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> TemplateRepository for SurrealTemplateRepository<C> {
    async fn create_master(&self, input: CreateTemplateMaster) -> AcbResult<TemplateMaster> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('templates_master', $id) SET \
                 template_name = $template_name, description = $description, \
                 status = $status, current_version_id = $current_version_id, \
                 access_type = $access_type, allowed_groups = $allowed_groups, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('templates_master', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("template_name", new.template_name))
            .bind(("description", new.description))
            .bind(("status", new.status.as_str()))
            .bind((
                "current_version_id",
                new.current_version_id.map(|id| id.to_string()),
            ))
            .bind(("access_type", new.access_config.access_type.as_str()))
            .bind(("allowed_groups", allowed_groups(&new.access_config)?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<MasterRow> = result.take(1).map_err(DbError::from)?;
        let master = single(rows, MASTERS, &id_str)?.try_into_master()?;
        debug!(id = %master.id, template_name = %master.template_name, "Template master created");
        Ok(master)
    }

    async fn get_master(&self, id: &DocId) -> AcbResult<TemplateMaster> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('templates_master', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MasterRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, MASTERS, &id_str)?.try_into_master()?)
    }

    async fn get_master_by_name(&self, template_name: &str) -> AcbResult<TemplateMaster> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM templates_master \
                 WHERE template_name = $template_name LIMIT 1",
            )
            .bind(("template_name", template_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MasterRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, MASTERS, template_name)?.try_into_master()?)
    }

    async fn update_master(
        &self,
        id: &DocId,
        input: UpdateTemplateMaster,
    ) -> AcbResult<TemplateMaster> {
        let stored = self.get_master(id).await?;
        let patch = input.validate(&stored, &self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.template_name.is_some() {
            sets.push("template_name = $template_name");
        }
        if patch.description.is_some() {
            sets.push("description = $description");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.current_version_id.is_some() {
            sets.push("current_version_id = $current_version_id");
        }
        if patch.access_config.is_some() {
            sets.push("access_type = $access_type");
            sets.push("allowed_groups = $allowed_groups");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('templates_master', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('templates_master', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(template_name) = patch.template_name {
            builder = builder.bind(("template_name", template_name));
        }
        if let Some(description) = patch.description {
            builder = builder.bind(("description", description));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(current_version_id) = patch.current_version_id {
            builder = builder.bind(("current_version_id", current_version_id.to_string()));
        }
        if let Some(access) = &patch.access_config {
            builder = builder
                .bind(("access_type", access.access_type.as_str()))
                .bind(("allowed_groups", allowed_groups(access)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<MasterRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, MASTERS, &id_str)?.try_into_master()?)
    }

    async fn delete_master(&self, id: &DocId) -> AcbResult<()> {
        self.get_master(id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE templates_versions WHERE template_master_id = $id; \
                 DELETE type::record('templates_master', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(%id, "Template master deleted with its versions");
        Ok(())
    }

    async fn list_masters(
        &self,
        pagination: Pagination,
    ) -> AcbResult<PaginatedResult<TemplateMaster>> {
        let total = count_all(&self.db, MASTERS).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM templates_master \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MasterRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(MasterRow::try_into_master)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn create_version(&self, input: CreateTemplateVersion) -> AcbResult<TemplateVersion> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('templates_versions', $id) SET \
                 template_master_id = $template_master_id, \
                 previous_version_id = $previous_version_id, \
                 version_num = $version_num, commit_message = $commit_message, \
                 content = $content, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('templates_versions', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("template_master_id", new.template_master_id.to_string()))
            .bind((
                "previous_version_id",
                new.previous_version_id.map(|id| id.to_string()),
            ))
            .bind(("version_num", new.version_num))
            .bind(("commit_message", new.commit_message))
            .bind(("content", serde_json::Value::Object(new.content)))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<VersionRow> = result.take(1).map_err(DbError::from)?;
        let version = single(rows, VERSIONS, &id_str)?.try_into_version()?;
        debug!(
            id = %version.id,
            master = %version.template_master_id,
            version_num = %version.version_num,
            "Template version created"
        );
        Ok(version)
    }

    async fn get_version(&self, id: &DocId) -> AcbResult<TemplateVersion> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('templates_versions', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, VERSIONS, &id_str)?.try_into_version()?)
    }

    async fn update_version(
        &self,
        id: &DocId,
        input: UpdateTemplateVersion,
    ) -> AcbResult<TemplateVersion> {
        self.get_version(id).await?;
        let patch = input.validate(&self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.commit_message.is_some() {
            sets.push("commit_message = $commit_message");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('templates_versions', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('templates_versions', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(commit_message) = patch.commit_message {
            builder = builder.bind(("commit_message", commit_message));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<VersionRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, VERSIONS, &id_str)?.try_into_version()?)
    }

    async fn list_versions(
        &self,
        master_id: &DocId,
        pagination: Pagination,
    ) -> AcbResult<PaginatedResult<TemplateVersion>> {
        self.get_master(master_id).await?;
        let master = master_id.to_string();
        let total = count_where(&self.db, VERSIONS, "template_master_id", master.clone()).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM templates_versions \
                 WHERE template_master_id = $master \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("master", master))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(VersionRow::try_into_version)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn commit_version(
        &self,
        mut input: CreateTemplateVersion,
    ) -> AcbResult<(TemplateMaster, TemplateVersion)> {
        // An unparsable or unknown master is left for validation to report.
        if input.previous_version_id.is_none()
            && let Ok(master_id) = DocId::parse(&input.template_master_id)
        {
            match self.get_master(&master_id).await {
                Ok(master) => {
                    input.previous_version_id =
                        master.current_version_id.map(|id| id.to_string());
                }
                Err(AcbError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        let new = input.validate(&self.lookup).await?;
        let version_id = DocId::generate();
        let master_id = new.template_master_id.clone();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('templates_versions', $version_id) SET \
                 template_master_id = $master_id, \
                 previous_version_id = $previous_version_id, \
                 version_num = $version_num, commit_message = $commit_message, \
                 content = $content, \
                 created_at = $created_at, creator_id = $creator_id; \
                 UPDATE type::record('templates_master', $master_id) SET \
                 current_version_id = $version_id, \
                 updated_at = $updated_at, updater_id = $creator_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("version_id", version_id.to_string()))
            .bind(("master_id", master_id.to_string()))
            .bind((
                "previous_version_id",
                new.previous_version_id.map(|id| id.to_string()),
            ))
            .bind(("version_num", new.version_num))
            .bind(("commit_message", new.commit_message))
            .bind(("content", serde_json::Value::Object(new.content)))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .bind(("updated_at", Utc::now()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(write_failed)?;

        let master = self.get_master(&master_id).await?;
        let version = self.get_version(&version_id).await?;
        info!(
            master = %master.id,
            version = %version.id,
            version_num = %version.version_num,
            "Template version committed"
        );
        Ok((master, version))
    }

    async fn version_history(&self, version_id: &DocId) -> AcbResult<Vec<TemplateVersion>> {
        let chain = version_chain(&self.lookup, VersionFamily::Templates, version_id).await?;
        let mut history = Vec::with_capacity(chain.len());
        for id in &chain {
            history.push(self.get_version(id).await?);
        }
        Ok(history)
    }
}
