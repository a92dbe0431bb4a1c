//! SurrealDB implementation of [`GroupRepository`].

use acb_core::error::AcbResult;
use acb_core::models::audit::UpdateStamp;
use acb_core::models::group::Group;
use acb_core::repository::{GroupRepository, PaginatedResult, Pagination};
use acb_core::schemas::group::{CreateGroup, GroupMemberInput, RemoveMemberInput, UpdateGroup};
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

const TABLE: &str = "groups";

#[derive(Debug, SurrealValue)]
struct GroupRow {
    record_id: String,
    group_name: String,
    country: String,
    description: Option<String>,
    users_access: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl GroupRow {
    fn try_into_group(self) -> Result<Group, DbError> {
        Ok(Group {
            id: parse_id(&self.record_id)?,
            group_name: self.group_name,
            country: self.country,
            description: self.description,
            users_access: from_json(self.users_access, "users_access")?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }

    /// Apply one membership change inside the `UPDATE` itself, so
    /// concurrent changes to the same group do not overwrite each other.
    async fn change_members(
        &self,
        id: &DocId,
        change: &'static str,
        value: serde_json::Value,
        stamp: &UpdateStamp,
    ) -> AcbResult<Group> {
        let id_str = id.to_string();
        let query = format!(
            "UPDATE type::record('groups', $id) SET {change}, \
             updated_at = $updated_at, updater_id = $updater_id; \
             SELECT meta::id(id) AS record_id, * FROM type::record('groups', $id);"
        );
        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("change", value))
            .bind(("updated_at", stamp.updated_at))
            .bind(("updater_id", stamp.updater_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<GroupRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_group()?)
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> AcbResult<Group> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('groups', $id) SET \
                 group_name = $group_name, country = $country, \
                 description = $description, users_access = $users_access, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('groups', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("group_name", new.group_name))
            .bind(("country", new.country))
            .bind(("description", new.description))
            .bind(("users_access", to_json(&new.users_access, "users_access")?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<GroupRow> = result.take(1).map_err(DbError::from)?;
        let group = single(rows, TABLE, &id_str)?.try_into_group()?;
        debug!(id = %group.id, group_name = %group.group_name, "Group created");
        Ok(group)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<Group> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('groups', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_group()?)
    }

    async fn get_by_name(&self, group_name: &str) -> AcbResult<Group> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM groups \
                 WHERE group_name = $group_name LIMIT 1",
            )
            .bind(("group_name", group_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, group_name)?.try_into_group()?)
    }

    async fn update(&self, id: &DocId, input: UpdateGroup) -> AcbResult<Group> {
        self.get_by_id(id).await?;
        let patch = input.validate(&self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.group_name.is_some() {
            sets.push("group_name = $group_name");
        }
        if patch.country.is_some() {
            sets.push("country = $country");
        }
        if patch.description.is_some() {
            sets.push("description = $description");
        }
        if patch.users_access.is_some() {
            sets.push("users_access = $users_access");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('groups', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('groups', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(group_name) = patch.group_name {
            builder = builder.bind(("group_name", group_name));
        }
        if let Some(country) = patch.country {
            builder = builder.bind(("country", country));
        }
        if let Some(description) = patch.description {
            builder = builder.bind(("description", description));
        }
        if let Some(users_access) = &patch.users_access {
            builder = builder.bind(("users_access", to_json(users_access, "users_access")?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<GroupRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_group()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "Group deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> AcbResult<PaginatedResult<Group>> {
        let total = count_all(&self.db, TABLE).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM groups \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(GroupRow::try_into_group)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(&self, id: &DocId, input: GroupMemberInput) -> AcbResult<Group> {
        self.get_by_id(id).await?;
        let change = input.validate(&self.lookup).await?;

        let group = self
            .change_members(
                id,
                "users_access = array::union(users_access, [$change])",
                to_json(&change.member, "users_access")?,
                &change.stamp,
            )
            .await?;
        debug!(%id, members = group.users_access.len(), "Group member added");
        Ok(group)
    }

    async fn remove_member(&self, id: &DocId, input: RemoveMemberInput) -> AcbResult<Group> {
        let group = self.get_by_id(id).await?;
        let removal = input.validate(&self.lookup).await?;

        if !group
            .users_access
            .iter()
            .any(|access| access.user_id == removal.user_id)
        {
            return Err(DbError::NotFound {
                entity: "group member".into(),
                id: removal.user_id.to_string(),
            }
            .into());
        }

        let group = self
            .change_members(
                id,
                "users_access = users_access[WHERE user_id != $change]",
                serde_json::Value::String(removal.user_id.to_string()),
                &removal.stamp,
            )
            .await?;
        debug!(%id, members = group.users_access.len(), "Group member removed");
        Ok(group)
    }
}
