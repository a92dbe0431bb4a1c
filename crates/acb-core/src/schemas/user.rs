use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::user::User;
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, update_stamp};
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateUser {
    pub ext_id: String,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
    /// Without a log the user is recorded as its own creator.
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateUser {
    /// Fixed at creation; rejected when present.
    pub ext_id: Option<String>,
    pub is_active: Option<bool>,
    pub log: Option<AuditLogUpdate>,
}

/// A validated user, id already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: DocId,
    pub ext_id: String,
    pub is_active: bool,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPatch {
    pub is_active: Option<bool>,
    pub stamp: UpdateStamp,
}

impl CreateUser {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewUser> {
        let mut v = Validator::new(lookup);
        let id = DocId::generate();

        let ext_id = v.require_text("ext_id", self.ext_id);
        let log = match self.log {
            Some(log) => log.validate_into(&mut v, "log").await?,
            None => Some(AuditLog::created_by(id.clone(), Utc::now())),
        };

        v.complete(|| {
            Some(NewUser {
                id,
                ext_id: ext_id?,
                is_active: self.is_active.unwrap_or(true),
                log: log?,
            })
        })
    }
}

impl UpdateUser {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<UserPatch> {
        let mut v = Validator::new(lookup);
        v.reject_immutable("ext_id", &self.ext_id);
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(UserPatch {
                is_active: self.is_active,
                stamp: stamp?,
            })
        })
    }
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            ext_id: self.ext_id,
            is_active: self.is_active,
            log: self.log,
        }
    }
}
