//! Visual resource metadata model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::access::AccessConfig;
use crate::models::audit::AuditLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Icon,
    Background,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Icon => "icon",
            FileType::Background => "background",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileType::Image),
            "icon" => Ok(FileType::Icon),
            "background" => Ok(FileType::Background),
            other => Err(format!("unknown file type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[default]
    Active,
    Archived,
}

impl ResourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceStatus::Active => "active",
            ResourceStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ResourceStatus::Active),
            "archived" => Ok(ResourceStatus::Archived),
            other => Err(format!("unknown resource status: {other}")),
        }
    }
}

/// Catalog entry for a visual file stored outside the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualResource {
    pub id: DocId,
    pub file_url: String,
    pub file_name: String,
    pub file_type: FileType,
    pub status: ResourceStatus,
    pub tags: Vec<String>,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}
