//! Role domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::audit::AuditLog;

/// CRUD flags a role grants on one application module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulePermission {
    #[serde(alias = "c")]
    pub create: bool,
    #[serde(alias = "r")]
    pub read: bool,
    #[serde(alias = "u")]
    pub update: bool,
    #[serde(alias = "d")]
    pub delete: bool,
}

impl ModulePermission {
    pub fn all() -> Self {
        Self {
            create: true,
            read: true,
            update: true,
            delete: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }
}

/// Module name to the permissions granted on it.
pub type PermissionMap = BTreeMap<String, ModulePermission>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: DocId,
    pub role_name: String,
    pub description: Option<String>,
    pub permissions: PermissionMap,
    pub log: AuditLog,
}
