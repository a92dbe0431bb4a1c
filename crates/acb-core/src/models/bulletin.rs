//! Bulletin master and version models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::AuditLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletinStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl BulletinStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BulletinStatus::Draft => "draft",
            BulletinStatus::Published => "published",
            BulletinStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for BulletinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulletinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BulletinStatus::Draft),
            "published" => Ok(BulletinStatus::Published),
            "archived" => Ok(BulletinStatus::Archived),
            other => Err(format!("unknown bulletin status: {other}")),
        }
    }
}

/// A bulletin built from a specific template version, grouping all of
/// its own versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinMaster {
    pub id: DocId,
    pub bulletin_name: String,
    pub base_template_master_id: DocId,
    pub base_template_version_id: DocId,
    pub current_version_id: Option<DocId>,
    pub status: BulletinStatus,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}

/// Immutable snapshot of the data entered into a bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinVersion {
    pub id: DocId,
    pub bulletin_master_id: DocId,
    pub previous_version_id: Option<DocId>,
    pub version_num: String,
    pub data: Payload,
    pub log: AuditLog,
}
