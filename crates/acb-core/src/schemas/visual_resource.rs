use serde::{Deserialize, Serialize};

use crate::error::AcbResult;
use crate::models::access::AccessConfig;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::visual_resource::{FileType, ResourceStatus, VisualResource};
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::access::{AccessConfigCreate, AccessConfigUpdate};
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateVisualResource {
    pub file_url: String,
    pub file_name: String,
    pub file_type: Option<FileType>,
    pub status: Option<ResourceStatus>,
    pub tags: Vec<String>,
    pub access_config: Option<AccessConfigCreate>,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateVisualResource {
    /// The stored file does not move; rejected when present.
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<FileType>,
    pub status: Option<ResourceStatus>,
    pub tags: Option<Vec<String>>,
    pub access_config: Option<AccessConfigUpdate>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVisualResource {
    pub file_url: String,
    pub file_name: String,
    pub file_type: FileType,
    pub status: ResourceStatus,
    pub tags: Vec<String>,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualResourcePatch {
    pub file_name: Option<String>,
    pub file_type: Option<FileType>,
    pub status: Option<ResourceStatus>,
    pub tags: Option<Vec<String>>,
    pub access_config: Option<AccessConfig>,
    pub stamp: UpdateStamp,
}

/// Trimmed, non-blank, first occurrence kept.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

impl CreateVisualResource {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewVisualResource> {
        let mut v = Validator::new(lookup);
        let file_url = v.require_text("file_url", self.file_url);
        let file_name = v.require_text("file_name", self.file_name);
        let file_type = v.require("file_type", self.file_type);
        let access_config =
            AccessConfigCreate::require_into(self.access_config, &mut v, "access_config").await?;
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewVisualResource {
                file_url: file_url?,
                file_name: file_name?,
                file_type: file_type?,
                status: self.status.unwrap_or_default(),
                tags: normalize_tags(self.tags),
                access_config: access_config?,
                log: log?,
            })
        })
    }
}

impl UpdateVisualResource {
    pub async fn validate<L: ReferenceLookup>(
        self,
        stored: &VisualResource,
        lookup: &L,
    ) -> AcbResult<VisualResourcePatch> {
        let mut v = Validator::new(lookup);
        v.reject_immutable("file_url", &self.file_url);
        let file_name = v.non_blank("file_name", self.file_name);
        let access_config = AccessConfigUpdate::merge_into(
            self.access_config,
            &mut v,
            "access_config",
            &stored.access_config,
        )
        .await?;
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(VisualResourcePatch {
                file_name,
                file_type: self.file_type,
                status: self.status,
                tags: self.tags.map(normalize_tags),
                access_config,
                stamp: stamp?,
            })
        })
    }
}
