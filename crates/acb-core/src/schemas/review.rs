use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{AcbError, AcbResult};
use crate::id::DocId;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::review::{BulletinReview, Comment};
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::comment::{CommentCreate, ThreadContext, validate_thread, validate_threads};
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateBulletinReview {
    pub bulletin_master_id: String,
    pub reviewer_user_id: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Vec<CommentCreate>,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBulletinReview {
    /// Fixed at creation; rejected when present.
    pub bulletin_master_id: Option<String>,
    /// Fixed at creation; rejected when present.
    pub reviewer_user_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Replaces every thread of the review.
    pub comments: Option<Vec<CommentCreate>>,
    pub log: Option<AuditLogUpdate>,
}

/// One comment appended to a stored review, top-level or as a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddComment {
    pub comment: Option<CommentCreate>,
    pub log: Option<AuditLogUpdate>,
}

/// New text for one stored comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditComment {
    pub text: String,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBulletinReview {
    pub bulletin_master_id: DocId,
    pub reviewer_user_id: DocId,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletinReviewPatch {
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<Vec<Comment>>,
    pub stamp: UpdateStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub comment: Comment,
    pub stamp: UpdateStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEdit {
    pub text: String,
    pub stamp: UpdateStamp,
}

impl CreateBulletinReview {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewBulletinReview> {
        let mut v = Validator::new(lookup);
        let bulletin_master_id = v
            .reference(
                "bulletin_master_id",
                Collection::BulletinsMaster,
                &self.bulletin_master_id,
            )
            .await?;
        let reviewer_user_id = v
            .reference("reviewer_user_id", Collection::Users, &self.reviewer_user_id)
            .await?;
        let mut taken = HashSet::new();
        let comments = validate_threads(
            &mut v,
            "comments",
            self.comments,
            ThreadContext {
                base_depth: 1,
                bulletin_master: bulletin_master_id.as_ref(),
                taken_ids: &mut taken,
            },
        )
        .await?;
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewBulletinReview {
                bulletin_master_id: bulletin_master_id?,
                reviewer_user_id: reviewer_user_id?,
                completed_at: self.completed_at,
                comments,
                log: log?,
            })
        })
    }
}

impl UpdateBulletinReview {
    pub async fn validate<L: ReferenceLookup>(
        self,
        stored: &BulletinReview,
        lookup: &L,
    ) -> AcbResult<BulletinReviewPatch> {
        let mut v = Validator::new(lookup);
        v.reject_immutable("bulletin_master_id", &self.bulletin_master_id);
        v.reject_immutable("reviewer_user_id", &self.reviewer_user_id);
        let comments = match self.comments {
            Some(threads) => {
                let mut taken = HashSet::new();
                Some(
                    validate_threads(
                        &mut v,
                        "comments",
                        threads,
                        ThreadContext {
                            base_depth: 1,
                            bulletin_master: Some(&stored.bulletin_master_id),
                            taken_ids: &mut taken,
                        },
                    )
                    .await?,
                )
            }
            None => None,
        };
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(BulletinReviewPatch {
                completed_at: self.completed_at,
                comments,
                stamp: stamp?,
            })
        })
    }
}

impl AddComment {
    /// Validate a comment for `stored`, as a reply to `parent` when given.
    ///
    /// The reply's depth counts from the parent's position, and its id
    /// must not collide with any comment already in the review.
    pub async fn validate<L: ReferenceLookup>(
        self,
        stored: &BulletinReview,
        parent: Option<&str>,
        lookup: &L,
    ) -> AcbResult<NewComment> {
        let base_depth = match parent {
            Some(parent) => {
                stored
                    .comment_depth(parent)
                    .ok_or_else(|| AcbError::NotFound {
                        entity: "comment".into(),
                        id: parent.to_owned(),
                    })?
                    + 1
            }
            None => 1,
        };

        let mut v = Validator::new(lookup);
        let mut taken: HashSet<String> =
            stored.comment_ids().into_iter().map(str::to_owned).collect();
        let comment = match v.require("comment", self.comment) {
            Some(comment) => {
                validate_thread(
                    &mut v,
                    "comment",
                    comment,
                    ThreadContext {
                        base_depth,
                        bulletin_master: Some(&stored.bulletin_master_id),
                        taken_ids: &mut taken,
                    },
                )
                .await?
            }
            None => None,
        };
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewComment {
                comment: comment?,
                stamp: stamp?,
            })
        })
    }
}

impl EditComment {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<CommentEdit> {
        let mut v = Validator::new(lookup);
        let text = v.require_text("text", self.text);
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(CommentEdit {
                text: text?,
                stamp: stamp?,
            })
        })
    }
}
