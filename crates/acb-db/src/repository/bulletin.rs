//! SurrealDB implementation of [`BulletinRepository`].

use acb_core::error::{AcbError, AcbResult};
use acb_core::models::bulletin::{BulletinMaster, BulletinStatus, BulletinVersion};
use acb_core::repository::{BulletinRepository, PaginatedResult, Pagination};
use acb_core::schemas::bulletin::{
    CreateBulletinMaster, CreateBulletinVersion, UpdateBulletinMaster, UpdateBulletinVersion,
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

const MASTERS: &str = "bulletins_master";
const VERSIONS: &str = "bulletins_versions";

#[derive(Debug, SurrealValue)]
struct MasterRow {
    record_id: String,
    bulletin_name: String,
    base_template_master_id: String,
    base_template_version_id: String,
    current_version_id: Option<String>,
    status: String,
    access_type: String,
    allowed_groups: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl MasterRow {
    fn try_into_master(self) -> Result<BulletinMaster, DbError> {
        Ok(BulletinMaster {
            id: parse_id(&self.record_id)?,
            bulletin_name: self.bulletin_name,
            base_template_master_id: parse_id(&self.base_template_master_id)?,
            base_template_version_id: parse_id(&self.base_template_version_id)?,
            current_version_id: parse_optional_id(self.current_version_id)?,
            status: parse_enum::<BulletinStatus>(&self.status)?,
            access_config: access_config(&self.access_type, self.allowed_groups)?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct VersionRow {
    record_id: String,
    bulletin_master_id: String,
    previous_version_id: Option<String>,
    version_num: String,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl VersionRow {
    fn try_into_version(self) -> Result<BulletinVersion, DbError> {
        Ok(BulletinVersion {
            id: parse_id(&self.record_id)?,
            bulletin_master_id: parse_id(&self.bulletin_master_id)?,
            previous_version_id: parse_optional_id(self.previous_version_id)?,
            version_num: self.version_num,
            data: payload(self.data, "data")?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the Bulletin repository.
#[derive(Clone)]
pub struct SurrealBulletinRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealBulletinRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> BulletinRepository for SurrealBulletinRepository<C> {
    async fn create_master(&self, input: CreateBulletinMaster) -> AcbResult<BulletinMaster> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('bulletins_master', $id) SET \
                 bulletin_name = $bulletin_name, \
                 base_template_master_id = $base_template_master_id, \
                 base_template_version_id = $base_template_version_id, \
                 current_version_id = $current_version_id, status = $status, \
                 access_type = $access_type, allowed_groups = $allowed_groups, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletins_master', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("bulletin_name", new.bulletin_name))
            .bind((
                "base_template_master_id",
                new.base_template_master_id.to_string(),
            ))
            .bind((
                "base_template_version_id",
                new.base_template_version_id.to_string(),
            ))
            .bind((
                "current_version_id",
                new.current_version_id.map(|id| id.to_string()),
            ))
            .bind(("status", new.status.as_str()))
            .bind(("access_type", new.access_config.access_type.as_str()))
            .bind(("allowed_groups", allowed_groups(&new.access_config)?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<MasterRow> = result.take(1).map_err(DbError::from)?;
        let master = single(rows, MASTERS, &id_str)?.try_into_master()?;
        debug!(
            id = %master.id,
            bulletin_name = %master.bulletin_name,
            base_template = %master.base_template_master_id,
            "Bulletin master created"
        );
        Ok(master)
    }

    async fn get_master(&self, id: &DocId) -> AcbResult<BulletinMaster> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletins_master', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MasterRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, MASTERS, &id_str)?.try_into_master()?)
    }

    async fn update_master(
        &self,
        id: &DocId,
        input: UpdateBulletinMaster,
    ) -> AcbResult<BulletinMaster> {
        let stored = self.get_master(id).await?;
        let patch = input.validate(&stored, &self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.bulletin_name.is_some() {
            sets.push("bulletin_name = $bulletin_name");
        }
        if patch.base_template_master_id.is_some() {
            sets.push("base_template_master_id = $base_template_master_id");
        }
        if patch.base_template_version_id.is_some() {
            sets.push("base_template_version_id = $base_template_version_id");
        }
        if patch.current_version_id.is_some() {
            sets.push("current_version_id = $current_version_id");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.access_config.is_some() {
            sets.push("access_type = $access_type");
            sets.push("allowed_groups = $allowed_groups");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('bulletins_master', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('bulletins_master', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(bulletin_name) = patch.bulletin_name {
            builder = builder.bind(("bulletin_name", bulletin_name));
        }
        if let Some(master) = patch.base_template_master_id {
            builder = builder.bind(("base_template_master_id", master.to_string()));
        }
        if let Some(version) = patch.base_template_version_id {
            builder = builder.bind(("base_template_version_id", version.to_string()));
        }
        if let Some(current_version_id) = patch.current_version_id {
            builder = builder.bind(("current_version_id", current_version_id.to_string()));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
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
                 DELETE bulletins_versions WHERE bulletin_master_id = $id; \
                 DELETE type::record('bulletins_master', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(%id, "Bulletin master deleted with its versions");
        Ok(())
    }

    async fn list_masters(
        &self,
        pagination: Pagination,
    ) -> AcbResult<PaginatedResult<BulletinMaster>> {
        let total = count_all(&self.db, MASTERS).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM bulletins_master \
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

    async fn create_version(&self, input: CreateBulletinVersion) -> AcbResult<BulletinVersion> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('bulletins_versions', $id) SET \
                 bulletin_master_id = $bulletin_master_id, \
                 previous_version_id = $previous_version_id, \
                 version_num = $version_num, data = $data, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletins_versions', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("bulletin_master_id", new.bulletin_master_id.to_string()))
            .bind((
                "previous_version_id",
                new.previous_version_id.map(|id| id.to_string()),
            ))
            .bind(("version_num", new.version_num))
            .bind(("data", serde_json::Value::Object(new.data)))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<VersionRow> = result.take(1).map_err(DbError::from)?;
        let version = single(rows, VERSIONS, &id_str)?.try_into_version()?;
        debug!(
            id = %version.id,
            master = %version.bulletin_master_id,
            version_num = %version.version_num,
            "Bulletin version created"
        );
        Ok(version)
    }

    async fn get_version(&self, id: &DocId) -> AcbResult<BulletinVersion> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletins_versions', $id)",
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
        input: UpdateBulletinVersion,
    ) -> AcbResult<BulletinVersion> {
        self.get_version(id).await?;
        let patch = input.validate(&self.lookup).await?;
        let id_str = id.to_string();

        // Committed bulletin data never changes; only the stamp moves.
        let result = self
            .db
            .query(
                "UPDATE type::record('bulletins_versions', $id) SET \
                 updated_at = $updated_at, updater_id = $updater_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletins_versions', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<VersionRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, VERSIONS, &id_str)?.try_into_version()?)
    }

    async fn list_versions(
        &self,
        master_id: &DocId,
        pagination: Pagination,
    ) -> AcbResult<PaginatedResult<BulletinVersion>> {
        self.get_master(master_id).await?;
        let master = master_id.to_string();
        let total = count_where(&self.db, VERSIONS, "bulletin_master_id", master.clone()).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM bulletins_versions \
                 WHERE bulletin_master_id = $master \
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
        mut input: CreateBulletinVersion,
    ) -> AcbResult<(BulletinMaster, BulletinVersion)> {
        // An unparsable or unknown master is left for validation to report.
        if input.previous_version_id.is_none()
            && let Ok(master_id) = DocId::parse(&input.bulletin_master_id)
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
        let master_id = new.bulletin_master_id.clone();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('bulletins_versions', $version_id) SET \
                 bulletin_master_id = $master_id, \
                 previous_version_id = $previous_version_id, \
                 version_num = $version_num, data = $data, \
                 created_at = $created_at, creator_id = $creator_id; \
                 UPDATE type::record('bulletins_master', $master_id) SET \
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
            .bind(("data", serde_json::Value::Object(new.data)))
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
            "Bulletin version committed"
        );
        Ok((master, version))
    }

    async fn version_history(&self, version_id: &DocId) -> AcbResult<Vec<BulletinVersion>> {
        let chain = version_chain(&self.lookup, VersionFamily::Bulletins, version_id).await?;
        let mut history = Vec::with_capacity(chain.len());
        for id in &chain {
            history.push(self.get_version(id).await?);
        }
        Ok(history)
    }
}
