//! User domain model.

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::audit::AuditLog;

/// A user of the authoring application, linked to an identity held by an
/// external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: DocId,
    pub ext_id: String,
    pub is_active: bool,
    pub log: AuditLog,
}
