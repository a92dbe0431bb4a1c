//! Group domain model.

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::audit::AuditLog;

/// A user's membership in a group, with the role they hold there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    pub user_id: DocId,
    pub role_id: DocId,
}

/// Users organised by affiliation. Groups are what restricted access
/// configurations point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: DocId,
    pub group_name: String,
    pub country: String,
    pub description: Option<String>,
    pub users_access: Vec<UserAccess>,
    pub log: AuditLog,
}
