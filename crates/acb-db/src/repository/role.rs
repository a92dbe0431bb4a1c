//! SurrealDB implementation of [`RoleRepository`].

use acb_core::error::AcbResult;
use acb_core::models::role::Role;
use acb_core::repository::{PaginatedResult, Pagination, RoleRepository};
use acb_core::schemas::role::{CreateRole, UpdateRole};
use acb_core::DocId;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    audit_log, count_all, delete_record, from_json, parse_id, single, to_json, write_failed,
};

const TABLE: &str = "roles";

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    role_name: String,
    description: Option<String>,
    permissions: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_id(&self.record_id)?,
            role_name: self.role_name,
            description: self.description,
            permissions: from_json(self.permissions, "permissions")?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> AcbResult<Role> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('roles', $id) SET \
                 role_name = $role_name, description = $description, \
                 permissions = $permissions, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('roles', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("role_name", new.role_name))
            .bind(("description", new.description))
            .bind(("permissions", to_json(&new.permissions, "permissions")?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let role = single(rows, TABLE, &id_str)?.try_into_role()?;
        debug!(id = %role.id, role_name = %role.role_name, "Role created");
        Ok(role)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<Role> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('roles', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_role()?)
    }

    async fn get_by_name(&self, role_name: &str) -> AcbResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM roles \
                 WHERE role_name = $role_name LIMIT 1",
            )
            .bind(("role_name", role_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, role_name)?.try_into_role()?)
    }

    async fn update(&self, id: &DocId, input: UpdateRole) -> AcbResult<Role> {
        self.get_by_id(id).await?;
        let patch = input.validate(&self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.role_name.is_some() {
            sets.push("role_name = $role_name");
        }
        if patch.description.is_some() {
            sets.push("description = $description");
        }
        if patch.permissions.is_some() {
            sets.push("permissions = $permissions");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('roles', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('roles', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(role_name) = patch.role_name {
            builder = builder.bind(("role_name", role_name));
        }
        if let Some(description) = patch.description {
            builder = builder.bind(("description", description));
        }
        if let Some(permissions) = &patch.permissions {
            builder = builder.bind(("permissions", to_json(permissions, "permissions")?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_role()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "Role deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> AcbResult<PaginatedResult<Role>> {
        let total = count_all(&self.db, TABLE).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM roles \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
