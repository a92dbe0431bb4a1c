//! SurrealDB implementation of [`UserRepository`].

use acb_core::error::AcbResult;
use acb_core::models::user::User;
use acb_core::repository::{PaginatedResult, Pagination, UserRepository};
use acb_core::schemas::user::{CreateUser, UpdateUser};
use acb_core::DocId;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    audit_log, count_all, delete_record, parse_id, single, write_failed,
};

const TABLE: &str = "users";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    ext_id: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_id(&self.record_id)?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
            ext_id: self.ext_id,
            is_active: self.is_active,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> AcbResult<User> {
        let new = input.validate(&self.lookup).await?;
        let id_str = new.id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('users', $id) SET \
                 ext_id = $ext_id, is_active = $is_active, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('users', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("ext_id", new.ext_id))
            .bind(("is_active", new.is_active))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let user = single(rows, TABLE, &id_str)?.try_into_user()?;
        debug!(id = %user.id, "User created");
        Ok(user)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<User> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('users', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_user()?)
    }

    async fn get_by_ext_id(&self, ext_id: &str) -> AcbResult<User> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM users WHERE ext_id = $ext_id LIMIT 1")
            .bind(("ext_id", ext_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, ext_id)?.try_into_user()?)
    }

    async fn update(&self, id: &DocId, input: UpdateUser) -> AcbResult<User> {
        self.get_by_id(id).await?;
        let patch = input.validate(&self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('users', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('users', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(is_active) = patch.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_user()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "User deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> AcbResult<PaginatedResult<User>> {
        let total = count_all(&self.db, TABLE).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM users \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
