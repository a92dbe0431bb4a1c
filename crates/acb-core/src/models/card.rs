//! Card domain model.

use serde::{Deserialize, Serialize};

use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::AuditLog;

/// Predefined content block that can be inserted into bulletins built
/// from any of the compatible templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: DocId,
    pub card_name: String,
    pub card_type: String,
    pub templates_master_ids: Vec<DocId>,
    pub access_config: AccessConfig,
    pub content: Payload,
    pub log: AuditLog,
}
