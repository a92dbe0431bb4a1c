//! Audit log embedded in every record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::DocId;

/// Creation and update provenance of a record.
///
/// `updated_at` and `updater_id` are either both absent (never updated)
/// or both present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub created_at: DateTime<Utc>,
    pub creator_id: DocId,
    pub updated_at: Option<DateTime<Utc>>,
    pub updater_id: Option<DocId>,
}

impl AuditLog {
    pub fn created_by(creator_id: DocId, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            creator_id,
            updated_at: None,
            updater_id: None,
        }
    }

    /// Record a mutation. Both halves are always written together.
    pub fn stamp(&mut self, stamp: &UpdateStamp) {
        self.updated_at = Some(stamp.updated_at);
        self.updater_id = Some(stamp.updater_id.clone());
    }

    pub fn is_consistent(&self) -> bool {
        self.updated_at.is_some() == self.updater_id.is_some()
    }
}

/// Validated "who and when" of an update. `updated_at` comes from the
/// clock at validation time, never from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStamp {
    pub updater_id: DocId,
    pub updated_at: DateTime<Utc>,
}
