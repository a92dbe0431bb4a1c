//! SurrealDB implementation of [`BulletinReviewRepository`].
//!
//! Comment threads are stored whole, as a JSON array on the review
//! record. A top-level comment is appended inside the `UPDATE`. Replies
//! and edits land inside a nested thread, so they rewrite the array from
//! the review as read; concurrent changes to the same review's threads
//! can overwrite each other.

use acb_core::error::{AcbError, AcbResult};
use acb_core::models::audit::UpdateStamp;
use acb_core::models::review::{BulletinReview, Comment};
use acb_core::repository::{BulletinReviewRepository, PaginatedResult, Pagination};
use acb_core::schemas::review::{
    AddComment, CreateBulletinReview, EditComment, UpdateBulletinReview,
};
use acb_core::DocId;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::lookup::SurrealReferenceLookup;
use crate::repository::row::{
    audit_log, count_where, delete_record, from_json, parse_id, single, to_json, write_failed,
};

const TABLE: &str = "bulletin_reviews";

#[derive(Debug, SurrealValue)]
struct ReviewRow {
    record_id: String,
    bulletin_master_id: String,
    reviewer_user_id: String,
    completed_at: Option<DateTime<Utc>>,
    comments: serde_json::Value,
    created_at: DateTime<Utc>,
    creator_id: String,
    updated_at: Option<DateTime<Utc>>,
    updater_id: Option<String>,
}

impl ReviewRow {
    fn try_into_review(self) -> Result<BulletinReview, DbError> {
        Ok(BulletinReview {
            id: parse_id(&self.record_id)?,
            bulletin_master_id: parse_id(&self.bulletin_master_id)?,
            reviewer_user_id: parse_id(&self.reviewer_user_id)?,
            log: audit_log(self.created_at, &self.creator_id, self.updated_at, self.updater_id)?,
            completed_at: self.completed_at,
            comments: from_json(self.comments, "comments")?,
        })
    }
}

/// SurrealDB implementation of the BulletinReview repository.
#[derive(Clone)]
pub struct SurrealBulletinReviewRepository<C: Connection> {
    db: Surreal<C>,
    lookup: SurrealReferenceLookup<C>,
}

impl<C: Connection> SurrealBulletinReviewRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            lookup: SurrealReferenceLookup::new(db.clone()),
            db,
        }
    }

    async fn write_comments(
        &self,
        id: &DocId,
        comments: &[Comment],
        stamp: &UpdateStamp,
    ) -> AcbResult<BulletinReview> {
        let id_str = id.to_string();
        let result = self
            .db
            .query(
                "UPDATE type::record('bulletin_reviews', $id) SET \
                 comments = $comments, \
                 updated_at = $updated_at, updater_id = $updater_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletin_reviews', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("comments", to_json(&comments, "comments")?))
            .bind(("updated_at", stamp.updated_at))
            .bind(("updater_id", stamp.updater_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_review()?)
    }
}

impl<C: Connection> BulletinReviewRepository for SurrealBulletinReviewRepository<C> {
    async fn create(&self, input: CreateBulletinReview) -> AcbResult<BulletinReview> {
        let new = input.validate(&self.lookup).await?;
        let id_str = DocId::generate().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('bulletin_reviews', $id) SET \
                 bulletin_master_id = $bulletin_master_id, \
                 reviewer_user_id = $reviewer_user_id, \
                 completed_at = $completed_at, comments = $comments, \
                 created_at = $created_at, creator_id = $creator_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletin_reviews', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("bulletin_master_id", new.bulletin_master_id.to_string()))
            .bind(("reviewer_user_id", new.reviewer_user_id.to_string()))
            .bind(("completed_at", new.completed_at))
            .bind(("comments", to_json(&new.comments, "comments")?))
            .bind(("created_at", new.log.created_at))
            .bind(("creator_id", new.log.creator_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        let review = single(rows, TABLE, &id_str)?.try_into_review()?;
        debug!(
            id = %review.id,
            bulletin = %review.bulletin_master_id,
            reviewer = %review.reviewer_user_id,
            "Bulletin review created"
        );
        Ok(review)
    }

    async fn get_by_id(&self, id: &DocId) -> AcbResult<BulletinReview> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletin_reviews', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_review()?)
    }

    async fn update(&self, id: &DocId, input: UpdateBulletinReview) -> AcbResult<BulletinReview> {
        let stored = self.get_by_id(id).await?;
        let patch = input.validate(&stored, &self.lookup).await?;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if patch.completed_at.is_some() {
            sets.push("completed_at = $completed_at");
        }
        if patch.comments.is_some() {
            sets.push("comments = $comments");
        }
        sets.push("updated_at = $updated_at");
        sets.push("updater_id = $updater_id");

        let query = format!(
            "UPDATE type::record('bulletin_reviews', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('bulletin_reviews', $id);",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("updated_at", patch.stamp.updated_at))
            .bind(("updater_id", patch.stamp.updater_id.to_string()));
        if let Some(completed_at) = patch.completed_at {
            builder = builder.bind(("completed_at", completed_at));
        }
        if let Some(comments) = &patch.comments {
            builder = builder.bind(("comments", to_json(comments, "comments")?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(write_failed)?;

        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, TABLE, &id_str)?.try_into_review()?)
    }

    async fn delete(&self, id: &DocId) -> AcbResult<()> {
        delete_record(&self.db, TABLE, id).await?;
        debug!(%id, "Bulletin review deleted");
        Ok(())
    }

    async fn list_by_bulletin(
        &self,
        bulletin_master_id: &DocId,
        pagination: Pagination,
    ) -> AcbResult<PaginatedResult<BulletinReview>> {
        let master = bulletin_master_id.to_string();
        let total = count_where(&self.db, TABLE, "bulletin_master_id", master.clone()).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM bulletin_reviews \
                 WHERE bulletin_master_id = $master \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("master", master))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ReviewRow::try_into_review)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_comment(&self, id: &DocId, input: AddComment) -> AcbResult<BulletinReview> {
        let review = self.get_by_id(id).await?;
        let new = input.validate(&review, None, &self.lookup).await?;
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('bulletin_reviews', $id) SET \
                 comments += $comment, \
                 updated_at = $updated_at, updater_id = $updater_id; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('bulletin_reviews', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("comment", to_json(&new.comment, "comments")?))
            .bind(("updated_at", new.stamp.updated_at))
            .bind(("updater_id", new.stamp.updater_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(write_failed)?;
        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        let review = single(rows, TABLE, &id_str)?.try_into_review()?;
        debug!(%id, comments = review.comments.len(), "Comment added to review");
        Ok(review)
    }

    async fn reply_to(
        &self,
        id: &DocId,
        parent_comment_id: &str,
        input: AddComment,
    ) -> AcbResult<BulletinReview> {
        let mut review = self.get_by_id(id).await?;
        let new = input
            .validate(&review, Some(parent_comment_id), &self.lookup)
            .await?;

        let parent =
            review
                .find_comment_mut(parent_comment_id)
                .ok_or_else(|| AcbError::NotFound {
                    entity: "comment".into(),
                    id: parent_comment_id.to_owned(),
                })?;
        parent.replies.push(new.comment);

        let review = self.write_comments(id, &review.comments, &new.stamp).await?;
        debug!(%id, parent = parent_comment_id, "Reply added to review");
        Ok(review)
    }

    async fn edit_comment(
        &self,
        id: &DocId,
        comment_id: &str,
        input: EditComment,
    ) -> AcbResult<BulletinReview> {
        let mut review = self.get_by_id(id).await?;
        let edit = input.validate(&self.lookup).await?;

        let comment = review
            .find_comment_mut(comment_id)
            .ok_or_else(|| AcbError::NotFound {
                entity: "comment".into(),
                id: comment_id.to_owned(),
            })?;
        comment.text = edit.text;

        let review = self.write_comments(id, &review.comments, &edit.stamp).await?;
        debug!(%id, comment = comment_id, "Review comment edited");
        Ok(review)
    }
}
