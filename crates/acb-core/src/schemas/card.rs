use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::card::Card;
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::access::{AccessConfigCreate, AccessConfigUpdate};
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCard {
    pub card_name: String,
    pub card_type: String,
    /// Templates the card can be placed in.
    pub templates_master_ids: Vec<String>,
    pub access_config: Option<AccessConfigCreate>,
    pub content: serde_json::Value,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCard {
    pub card_name: Option<String>,
    pub card_type: Option<String>,
    pub templates_master_ids: Option<Vec<String>>,
    pub access_config: Option<AccessConfigUpdate>,
    pub content: Option<serde_json::Value>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub card_name: String,
    pub card_type: String,
    pub templates_master_ids: Vec<DocId>,
    pub access_config: AccessConfig,
    pub content: Payload,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardPatch {
    pub card_name: Option<String>,
    pub card_type: Option<String>,
    pub templates_master_ids: Option<Vec<DocId>>,
    pub access_config: Option<AccessConfig>,
    pub content: Option<Payload>,
    pub stamp: UpdateStamp,
}

impl CreateCard {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewCard> {
        let mut v = Validator::new(lookup);
        let card_name = v.require_text("card_name", self.card_name);
        let card_type = v.require_text("card_type", self.card_type);
        let templates_master_ids = v
            .references(
                "templates_master_ids",
                Collection::TemplatesMaster,
                &self.templates_master_ids,
            )
            .await?;
        let access_config =
            AccessConfigCreate::require_into(self.access_config, &mut v, "access_config").await?;
        let content = v.require_payload("content", self.content);
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewCard {
                card_name: card_name?,
                card_type: card_type?,
                templates_master_ids,
                access_config: access_config?,
                content: content?,
                log: log?,
            })
        })
    }
}

impl UpdateCard {
    pub async fn validate<L: ReferenceLookup>(self, stored: &Card, lookup: &L) -> AcbResult<CardPatch> {
        let mut v = Validator::new(lookup);
        let card_name = v.non_blank("card_name", self.card_name);
        let card_type = v.non_blank("card_type", self.card_type);
        let templates_master_ids = match self.templates_master_ids {
            Some(raws) => Some(
                v.references("templates_master_ids", Collection::TemplatesMaster, &raws)
                    .await?,
            ),
            None => None,
        };
        let access_config = AccessConfigUpdate::merge_into(
            self.access_config,
            &mut v,
            "access_config",
            &stored.access_config,
        )
        .await?;
        let content = v.optional_payload("content", self.content);
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(CardPatch {
                card_name,
                card_type,
                templates_master_ids,
                access_config,
                content,
                stamp: stamp?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FieldErrorKind;
    use crate::models::access::AccessType;
    use crate::validation::InMemoryLookup;

    #[tokio::test]
    async fn every_template_reference_is_checked() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let template = lookup.insert_new(Collection::TemplatesMaster);

        let err = CreateCard {
            card_name: "rainfall".into(),
            card_type: "chart".into(),
            templates_master_ids: vec![template.to_string(), "123".into()],
            access_config: Some(AccessConfigCreate::public()),
            content: json!({"kind": "bar"}),
            log: Some(AuditLogCreate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap_err();

        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "templates_master_ids[1]");
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::MalformedIdentifier { .. }
        ));
    }

    #[tokio::test]
    async fn restricted_card_keeps_its_groups() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let group = lookup.insert_new(Collection::Groups);

        let card = CreateCard {
            card_name: "rainfall".into(),
            card_type: "chart".into(),
            templates_master_ids: Vec::new(),
            access_config: Some(AccessConfigCreate::restricted_to([group.to_string()])),
            content: json!({}),
            log: Some(AuditLogCreate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap();

        assert_eq!(card.access_config.access_type, AccessType::Restricted);
        assert_eq!(card.access_config.allowed_groups, vec![group]);
    }
}
