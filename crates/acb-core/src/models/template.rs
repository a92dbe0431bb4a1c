//! Template master and version models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::AuditLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Archived,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TemplateStatus::Active),
            "archived" => Ok(TemplateStatus::Archived),
            other => Err(format!("unknown template status: {other}")),
        }
    }
}

/// Long-lived anchor of a template; points at the version currently in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMaster {
    pub id: DocId,
    pub template_name: String,
    pub description: Option<String>,
    pub status: TemplateStatus,
    /// `None` until the first version is committed.
    pub current_version_id: Option<DocId>,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}

/// Immutable snapshot of a template's structure and design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: DocId,
    pub template_master_id: DocId,
    /// `None` marks the root of the chain.
    pub previous_version_id: Option<DocId>,
    pub version_num: String,
    pub commit_message: String,
    pub content: Payload,
    pub log: AuditLog,
}
