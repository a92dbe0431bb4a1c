use serde::{Deserialize, Serialize};

use crate::collection::{Collection, VersionFamily};
use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::template::{TemplateMaster, TemplateStatus};
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::access::{AccessConfigCreate, AccessConfigUpdate};
use crate::validation::chain::check_version_owner;
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTemplateMaster {
    pub template_name: String,
    pub description: Option<String>,
    pub status: Option<TemplateStatus>,
    pub current_version_id: Option<String>,
    pub access_config: Option<AccessConfigCreate>,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTemplateMaster {
    pub template_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TemplateStatus>,
    pub current_version_id: Option<String>,
    pub access_config: Option<AccessConfigUpdate>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplateMaster {
    pub template_name: String,
    pub description: Option<String>,
    pub status: TemplateStatus,
    pub current_version_id: Option<DocId>,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}

/// Validated master update. `access_config` is already merged with the
/// stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMasterPatch {
    pub template_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TemplateStatus>,
    pub current_version_id: Option<DocId>,
    pub access_config: Option<AccessConfig>,
    pub stamp: UpdateStamp,
}

impl CreateTemplateMaster {
    /// `current_version_id` is only checked for existence here: the master
    /// has no id yet, so ownership cannot be verified.
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewTemplateMaster> {
        let mut v = Validator::new(lookup);
        let template_name = v.require_text("template_name", self.template_name);
        let status = v.require("status", self.status);
        let current_version_id = v
            .optional_reference(
                "current_version_id",
                Collection::TemplatesVersions,
                self.current_version_id.as_deref(),
            )
            .await?;
        let access_config =
            AccessConfigCreate::require_into(self.access_config, &mut v, "access_config").await?;
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewTemplateMaster {
                template_name: template_name?,
                description: self.description,
                status: status?,
                current_version_id,
                access_config: access_config?,
                log: log?,
            })
        })
    }
}

impl UpdateTemplateMaster {
    /// Validate against the stored master: a new current version must be
    /// one of its own versions.
    pub async fn validate<L: ReferenceLookup>(
        self,
        stored: &TemplateMaster,
        lookup: &L,
    ) -> AcbResult<TemplateMasterPatch> {
        let mut v = Validator::new(lookup);
        let template_name = v.non_blank("template_name", self.template_name);
        let current_version_id =
            owned_version(&mut v, "current_version_id", self.current_version_id, &stored.id)
                .await?;
        let access_config = AccessConfigUpdate::merge_into(
            self.access_config,
            &mut v,
            "access_config",
            &stored.access_config,
        )
        .await?;
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(TemplateMasterPatch {
                template_name,
                description: self.description,
                status: self.status,
                current_version_id,
                access_config,
                stamp: stamp?,
            })
        })
    }
}

/// Optional version reference that must belong to `master`.
async fn owned_version<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    field: &str,
    raw: Option<String>,
    master: &DocId,
) -> AcbResult<Option<DocId>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let Some(version) = v
        .optional_reference(field, Collection::TemplatesVersions, Some(&raw))
        .await?
    else {
        return Ok(None);
    };
    let owned = check_version_owner(v, field, VersionFamily::Templates, &version, master).await?;
    Ok(owned.then_some(version))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTemplateVersion {
    pub template_master_id: String,
    /// `None` marks the root of the chain.
    pub previous_version_id: Option<String>,
    pub version_num: String,
    pub commit_message: String,
    pub content: serde_json::Value,
    pub log: Option<AuditLogCreate>,
}

/// Versions are immutable: every field but `commit_message` is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTemplateVersion {
    pub template_master_id: Option<String>,
    pub previous_version_id: Option<String>,
    pub version_num: Option<String>,
    pub content: Option<serde_json::Value>,
    pub commit_message: Option<String>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplateVersion {
    pub template_master_id: DocId,
    pub previous_version_id: Option<DocId>,
    pub version_num: String,
    pub commit_message: String,
    pub content: Payload,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateVersionPatch {
    pub commit_message: Option<String>,
    pub stamp: UpdateStamp,
}

impl CreateTemplateVersion {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewTemplateVersion> {
        let mut v = Validator::new(lookup);
        let template_master_id = v
            .reference(
                "template_master_id",
                Collection::TemplatesMaster,
                &self.template_master_id,
            )
            .await?;
        let previous_version_id = match &template_master_id {
            Some(master) => {
                owned_version(&mut v, "previous_version_id", self.previous_version_id, master)
                    .await?
            }
            None => {
                v.optional_reference(
                    "previous_version_id",
                    Collection::TemplatesVersions,
                    self.previous_version_id.as_deref(),
                )
                .await?
            }
        };
        let version_num = v.require_text("version_num", self.version_num);
        let commit_message = v.require_text("commit_message", self.commit_message);
        let content = v.require_payload("content", self.content);
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewTemplateVersion {
                template_master_id: template_master_id?,
                previous_version_id,
                version_num: version_num?,
                commit_message: commit_message?,
                content: content?,
                log: log?,
            })
        })
    }
}

impl UpdateTemplateVersion {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<TemplateVersionPatch> {
        let mut v = Validator::new(lookup);
        v.reject_immutable("template_master_id", &self.template_master_id);
        v.reject_immutable("previous_version_id", &self.previous_version_id);
        v.reject_immutable("version_num", &self.version_num);
        v.reject_immutable("content", &self.content);
        let commit_message = v.non_blank("commit_message", self.commit_message);
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(TemplateVersionPatch {
                commit_message,
                stamp: stamp?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::error::FieldErrorKind;
    use crate::validation::{InMemoryLookup, VersionLink};

    struct Fixture {
        lookup: InMemoryLookup,
        admin: DocId,
        master: DocId,
        v1: DocId,
    }

    fn fixture() -> Fixture {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let master = lookup.insert_new(Collection::TemplatesMaster);
        let v1 = DocId::generate();
        lookup.insert_version(
            VersionFamily::Templates,
            v1.clone(),
            VersionLink {
                master_id: master.clone(),
                previous_version_id: None,
            },
        );
        Fixture {
            lookup,
            admin,
            master,
            v1,
        }
    }

    fn stored_master(f: &Fixture) -> TemplateMaster {
        TemplateMaster {
            id: f.master.clone(),
            template_name: "weekly".into(),
            description: None,
            status: TemplateStatus::Active,
            current_version_id: Some(f.v1.clone()),
            access_config: AccessConfig::public(),
            log: AuditLog::created_by(f.admin.clone(), Utc::now()),
        }
    }

    fn version_input(f: &Fixture, previous: Option<&DocId>) -> CreateTemplateVersion {
        CreateTemplateVersion {
            template_master_id: f.master.to_string(),
            previous_version_id: previous.map(DocId::to_string),
            version_num: "1.1".into(),
            commit_message: "tweak header".into(),
            content: json!({"sections": []}),
            log: Some(AuditLogCreate::by(&f.admin)),
        }
    }

    #[tokio::test]
    async fn version_chains_onto_sibling() {
        let f = fixture();
        let version = version_input(&f, Some(&f.v1)).validate(&f.lookup).await.unwrap();
        assert_eq!(version.previous_version_id, Some(f.v1.clone()));
        assert_eq!(version.template_master_id, f.master);
    }

    #[tokio::test]
    async fn previous_version_of_another_master_is_rejected() {
        let mut f = fixture();
        let other = f.lookup.insert_new(Collection::TemplatesMaster);
        let foreign = DocId::generate();
        f.lookup.insert_version(
            VersionFamily::Templates,
            foreign.clone(),
            VersionLink {
                master_id: other,
                previous_version_id: None,
            },
        );

        let err = version_input(&f, Some(&foreign))
            .validate(&f.lookup)
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "previous_version_id");
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::VersionMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn content_must_be_an_object() {
        let f = fixture();
        let mut input = version_input(&f, None);
        input.content = json!("plain text");
        let err = input.validate(&f.lookup).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "content");
    }

    #[tokio::test]
    async fn version_content_is_immutable() {
        let f = fixture();
        let err = UpdateTemplateVersion {
            content: Some(json!({})),
            version_num: Some("2".into()),
            commit_message: Some("reworded".into()),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&f.lookup)
        .await
        .unwrap_err();

        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["version_num", "content"]);
        assert!(err
            .field_errors()
            .iter()
            .all(|e| e.kind == FieldErrorKind::ImmutableField));
    }

    #[tokio::test]
    async fn commit_message_alone_may_change() {
        let f = fixture();
        let patch = UpdateTemplateVersion {
            commit_message: Some("reworded".into()),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&f.lookup)
        .await
        .unwrap();
        assert_eq!(patch.commit_message.as_deref(), Some("reworded"));
    }

    #[tokio::test]
    async fn master_create_checks_current_version_exists() {
        let f = fixture();
        let input = CreateTemplateMaster {
            template_name: "daily".into(),
            status: Some(TemplateStatus::Active),
            current_version_id: Some(DocId::generate().to_string()),
            access_config: Some(AccessConfigCreate::public()),
            log: Some(AuditLogCreate::by(&f.admin)),
            ..Default::default()
        };
        let err = input.validate(&f.lookup).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "current_version_id");
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::DanglingReference { .. }
        ));
    }

    #[tokio::test]
    async fn master_update_requires_own_version() {
        let mut f = fixture();
        let stored = stored_master(&f);
        let other = f.lookup.insert_new(Collection::TemplatesMaster);
        let foreign = DocId::generate();
        f.lookup.insert_version(
            VersionFamily::Templates,
            foreign.clone(),
            VersionLink {
                master_id: other,
                previous_version_id: None,
            },
        );

        let err = UpdateTemplateMaster {
            current_version_id: Some(foreign.to_string()),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&stored, &f.lookup)
        .await
        .unwrap_err();
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::VersionMismatch { .. }
        ));

        let patch = UpdateTemplateMaster {
            current_version_id: Some(f.v1.to_string()),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&stored, &f.lookup)
        .await
        .unwrap();
        assert_eq!(patch.current_version_id, Some(f.v1.clone()));
    }

    #[tokio::test]
    async fn master_create_requires_access_config() {
        let f = fixture();
        let err = CreateTemplateMaster {
            template_name: "daily".into(),
            status: Some(TemplateStatus::Active),
            log: Some(AuditLogCreate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&f.lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "access_config");
    }
}
