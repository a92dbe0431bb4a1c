//! Bulletin review and comment thread models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::audit::AuditLog;

/// The part of a bulletin a comment points at.
///
/// Containment: `field_id` requires `block_id` and `section_id`;
/// `block_id` requires `section_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetElement {
    pub section_id: Option<String>,
    pub block_id: Option<String>,
    pub field_id: Option<String>,
}

/// A comment on a bulletin version, with its replies nested inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Client-supplied identifier, used to address replies.
    pub comment_id: Option<String>,
    pub bulletin_version_id: DocId,
    pub text: String,
    pub author_id: DocId,
    pub created_at: DateTime<Utc>,
    pub target_element: Option<TargetElement>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Level of the comment with the given client id, 1 for this one.
    pub fn depth_of(&self, comment_id: &str) -> Option<usize> {
        if self.comment_id.as_deref() == Some(comment_id) {
            return Some(1);
        }
        self.replies
            .iter()
            .find_map(|reply| reply.depth_of(comment_id))
            .map(|depth| depth + 1)
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        ids.extend(self.comment_id.as_deref());
        for reply in &self.replies {
            reply.collect_ids(ids);
        }
    }

    /// Depth-first search for the comment with the given client id.
    pub fn find_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        if self.comment_id.as_deref() == Some(comment_id) {
            return Some(self);
        }
        self.replies
            .iter_mut()
            .find_map(|reply| reply.find_mut(comment_id))
    }
}

/// One review cycle of a bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinReview {
    pub id: DocId,
    pub bulletin_master_id: DocId,
    pub reviewer_user_id: DocId,
    pub log: AuditLog,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
}

impl BulletinReview {
    /// Every client comment id in the review, at any depth.
    pub fn comment_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for comment in &self.comments {
            comment.collect_ids(&mut ids);
        }
        ids
    }

    pub fn comment_depth(&self, comment_id: &str) -> Option<usize> {
        self.comments
            .iter()
            .find_map(|comment| comment.depth_of(comment_id))
    }

    pub fn find_comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find_map(|comment| comment.find_mut(comment_id))
    }
}
