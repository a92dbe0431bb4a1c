use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::validation::{ReferenceLookup, Validator, field_path};

/// Creation half of the audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLogCreate {
    /// Defaults to now.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "creator_user_id")]
    pub creator_id: String,
}

impl AuditLogCreate {
    pub fn by(creator: &DocId) -> Self {
        Self {
            created_at: None,
            creator_id: creator.to_string(),
        }
    }

    pub async fn validate_into<L: ReferenceLookup>(
        self,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<AuditLog>> {
        let creator = v
            .reference(&field_path(field, "creator_id"), Collection::Users, &self.creator_id)
            .await?;
        Ok(creator.map(|creator| {
            AuditLog::created_by(creator, self.created_at.unwrap_or_else(Utc::now))
        }))
    }
}

/// Update half of the audit log. Only the updater is accepted; a
/// supplied `updated_at` is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLogUpdate {
    #[serde(alias = "updater_user_id")]
    pub updater_id: String,
}

impl AuditLogUpdate {
    pub fn by(updater: &DocId) -> Self {
        Self {
            updater_id: updater.to_string(),
        }
    }

    pub async fn validate_into<L: ReferenceLookup>(
        self,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<UpdateStamp>> {
        let updater = v
            .reference(&field_path(field, "updater_id"), Collection::Users, &self.updater_id)
            .await?;
        Ok(updater.map(|updater_id| UpdateStamp {
            updater_id,
            updated_at: Utc::now(),
        }))
    }
}

/// The required `log` of a create input.
pub(crate) async fn creation_log<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    log: Option<AuditLogCreate>,
) -> AcbResult<Option<AuditLog>> {
    match v.require("log", log) {
        Some(log) => log.validate_into(v, "log").await,
        None => Ok(None),
    }
}

/// The required `log` of an update input.
pub(crate) async fn update_stamp<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    log: Option<AuditLogUpdate>,
) -> AcbResult<Option<UpdateStamp>> {
    match v.require("log", log) {
        Some(log) => log.validate_into(v, "log").await,
        None => Ok(None),
    }
}
