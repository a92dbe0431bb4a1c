//! SurrealDB implementation of [`CardRepository`].

use acb_core::DocId;
use acb_core::error::AcbResult;
use acb_core::models::card::Card;
use acb_core::repository::{CardRepository, PaginatedResult, Pagination};
use acb_core::schemas::card::{CreateCard, UpdateCard};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    access_config, allowed_groups, audit_log, count_all, delete_record, from_json, parse_id,
    payload, single, to_json, write_failed,
};

const TABLE: &str = "cards";

#[derive(Debug, SurrealValue)]
struct CardRow {
    record_id: String,
    card_name: String,
    card_type: String,
    templates_master_ids: serde_json::Value,
    access_type: String,
    allowed_groups: serde_json::Value,
    content: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl CardRow {
    fn try_into_card(self) -> Result<Card, DbError> {
        Ok(Card {
            id: parse_id(&self.record_id)?,
            card_name: self.card_name,
            card_type: self.card_type,
            templates_master_ids: from_json(self.templates_master_ids, "templates_master_ids")?,
            access_config: access_config(&self.access_type, self.allowed_groups)?,
            content: payload(self.content, "content")?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
        })
    }
}

/// SurrealDB implementation of the Card repository.
#[derive(Clone)]
pub struct SurrealCardRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealCardRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> CardRepository for SurrealCardRepository<C> {
    async fn create(&self, input: CreateCard) -> AcbResult<Card> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('cards', $id) SET \
                 card_name = $card_name, card_type = $card_type, \
                 templates_master_ids = $templates_master_ids, \
                 access_type = $access_type, allowed_groups = $allowed_groups, \
                 content = $content, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('cards', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("card_name", new.card_name))
            .bind(("card_type", new.card_type))
            .bind((
                "templates_master_ids",
                to_json(&new.templates_master_ids, "templates_master_ids")?,
            ))
            .bind(("access_type", new.access_config.access_type.as_str()))
            .bind(("allowed_groups", allowed_groups(&new.access_config)?))
            .bind(("content", serde_json::Value::Object(new.content)))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<CardRow> = result.take(1).map_err(DbError::from)?;
        let card = single(rows, TABLE, &id_str)?.try_into_card()?;
        debug!(id = %card.id, card_name = %card.card_name, "Card created");
        Ok(card)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<Card> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('cards', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CardRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_card()?)
    }

    async fn update(&self, id: &DocId, input: UpdateCard) -> AcbResult<Card> {
        let stored = self.get_by_id(id).await?;
        let patch = input.validate(&stored, &self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.card_name.is_some() {
            sets.push("card_name = $card_name");
        }
        if patch.card_type.is_some() {
            sets.push("card_type = $card_type");
        }
        if patch.templates_master_ids.is_some() {
            sets.push("templates_master_ids = $templates_master_ids");
        }
        if patch.access_config.is_some() {
            sets.push("access_type = $access_type");
            sets.push("allowed_groups = $allowed_groups");
        }
        if patch.content.is_some() {
            sets.push("content = $content");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('cards', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('cards', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(card_name) = patch.card_name {
            builder = builder.bind(("card_name", card_name));
        }
        if let Some(card_type) = patch.card_type {
            builder = builder.bind(("card_type", card_type));
        }
        if let Some(ids) = &patch.templates_master_ids {
            builder = builder.bind(("templates_master_ids", to_json(ids, "templates_master_ids")?));
        }
        if let Some(access) = &patch.access_config {
            builder = builder
                .bind(("access_type", access.access_type.as_str()))
                .bind(("allowed_groups", allowed_groups(access)?));
        }
        if let Some(content) = patch.content {
            builder = builder.bind(("content", serde_json::Value::Object(content)));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<CardRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_card()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "Card deleted");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> AcbResult<PaginatedResult<Card>> {
        let total = count_all(&self.db, TABLE).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM cards \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CardRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(CardRow::try_into_card)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_for_template(&self, template_master_id: &DocId) -> AcbResult<Vec<Card>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM cards \
                 WHERE templates_master_ids CONTAINS $template \
                 ORDER BY created_at ASC",
            )
            .bind(("template", template_master_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CardRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(CardRow::try_into_card)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
