use serde::{Deserialize, Serialize};

use crate::collection::{Collection, VersionFamily};
use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::Payload;
use crate::models::access::AccessConfig;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::bulletin::{BulletinMaster, BulletinStatus};
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::access::{AccessConfigCreate, AccessConfigUpdate};
use crate::validation::chain::check_version_owner;
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateBulletinMaster {
    pub bulletin_name: String,
    pub base_template_master_id: String,
    pub base_template_version_id: String,
    pub current_version_id: Option<String>,
    /// Defaults to `draft`.
    pub status: Option<BulletinStatus>,
    pub access_config: Option<AccessConfigCreate>,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBulletinMaster {
    pub bulletin_name: Option<String>,
    pub base_template_master_id: Option<String>,
    pub base_template_version_id: Option<String>,
    pub current_version_id: Option<String>,
    pub status: Option<BulletinStatus>,
    pub access_config: Option<AccessConfigUpdate>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBulletinMaster {
    pub bulletin_name: String,
    pub base_template_master_id: DocId,
    pub base_template_version_id: DocId,
    pub current_version_id: Option<DocId>,
    pub status: BulletinStatus,
    pub access_config: AccessConfig,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletinMasterPatch {
    pub bulletin_name: Option<String>,
    pub base_template_master_id: Option<DocId>,
    pub base_template_version_id: Option<DocId>,
    pub current_version_id: Option<DocId>,
    pub status: Option<BulletinStatus>,
    pub access_config: Option<AccessConfig>,
    pub stamp: UpdateStamp,
}

impl CreateBulletinMaster {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewBulletinMaster> {
        let mut v = Validator::new(lookup);
        let bulletin_name = v.require_text("bulletin_name", self.bulletin_name);
        let base_master = v
            .reference(
                "base_template_master_id",
                Collection::TemplatesMaster,
                &self.base_template_master_id,
            )
            .await?;
        let mut base_version = v
            .reference(
                "base_template_version_id",
                Collection::TemplatesVersions,
                &self.base_template_version_id,
            )
            .await?;
        if let (Some(master), Some(version)) = (&base_master, &base_version)
            && !check_version_owner(
                &mut v,
                "base_template_version_id",
                VersionFamily::Templates,
                version,
                master,
            )
            .await?
        {
            base_version = None;
        }
        let current_version_id = v
            .optional_reference(
                "current_version_id",
                Collection::BulletinsVersions,
                self.current_version_id.as_deref(),
            )
            .await?;
        let access_config =
            AccessConfigCreate::require_into(self.access_config, &mut v, "access_config").await?;
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewBulletinMaster {
                bulletin_name: bulletin_name?,
                base_template_master_id: base_master?,
                base_template_version_id: base_version?,
                current_version_id,
                status: self.status.unwrap_or_default(),
                access_config: access_config?,
                log: log?,
            })
        })
    }
}

impl UpdateBulletinMaster {
    /// Validate against the stored bulletin. When either half of the base
    /// template pair changes, the resulting pair must still match.
    pub async fn validate<L: ReferenceLookup>(
        self,
        stored: &BulletinMaster,
        lookup: &L,
    ) -> AcbResult<BulletinMasterPatch> {
        let mut v = Validator::new(lookup);
        let bulletin_name = v.non_blank("bulletin_name", self.bulletin_name);

        let base_master = v
            .optional_reference(
                "base_template_master_id",
                Collection::TemplatesMaster,
                self.base_template_master_id.as_deref(),
            )
            .await?;
        let mut base_version = v
            .optional_reference(
                "base_template_version_id",
                Collection::TemplatesVersions,
                self.base_template_version_id.as_deref(),
            )
            .await?;
        let base_changed = self.base_template_master_id.is_some()
            || self.base_template_version_id.is_some();
        if base_changed
            && !v.has_errors_at("base_template_master_id")
            && !v.has_errors_at("base_template_version_id")
        {
            let master = base_master
                .as_ref()
                .unwrap_or(&stored.base_template_master_id);
            let version = base_version
                .as_ref()
                .unwrap_or(&stored.base_template_version_id);
            if !check_version_owner(
                &mut v,
                "base_template_version_id",
                VersionFamily::Templates,
                version,
                master,
            )
            .await?
            {
                base_version = None;
            }
        }

        let mut current_version_id = v
            .optional_reference(
                "current_version_id",
                Collection::BulletinsVersions,
                self.current_version_id.as_deref(),
            )
            .await?;
        if let Some(version) = &current_version_id
            && !check_version_owner(
                &mut v,
                "current_version_id",
                VersionFamily::Bulletins,
                version,
                &stored.id,
            )
            .await?
        {
            current_version_id = None;
        }

        let access_config = AccessConfigUpdate::merge_into(
            self.access_config,
            &mut v,
            "access_config",
            &stored.access_config,
        )
        .await?;
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(BulletinMasterPatch {
                bulletin_name,
                base_template_master_id: base_master,
                base_template_version_id: base_version,
                current_version_id,
                status: self.status,
                access_config,
                stamp: stamp?,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateBulletinVersion {
    pub bulletin_master_id: String,
    pub previous_version_id: Option<String>,
    pub version_num: String,
    pub data: serde_json::Value,
    pub log: Option<AuditLogCreate>,
}

/// Bulletin versions are fully immutable; only the audit stamp moves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBulletinVersion {
    pub bulletin_master_id: Option<String>,
    pub previous_version_id: Option<String>,
    pub version_num: Option<String>,
    pub data: Option<serde_json::Value>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBulletinVersion {
    pub bulletin_master_id: DocId,
    pub previous_version_id: Option<DocId>,
    pub version_num: String,
    pub data: Payload,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletinVersionPatch {
    pub stamp: UpdateStamp,
}

impl CreateBulletinVersion {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewBulletinVersion> {
        let mut v = Validator::new(lookup);
        let bulletin_master_id = v
            .reference(
                "bulletin_master_id",
                Collection::BulletinsMaster,
                &self.bulletin_master_id,
            )
            .await?;
        let mut previous_version_id = v
            .optional_reference(
                "previous_version_id",
                Collection::BulletinsVersions,
                self.previous_version_id.as_deref(),
            )
            .await?;
        if let (Some(master), Some(previous)) = (&bulletin_master_id, &previous_version_id)
            && !check_version_owner(
                &mut v,
                "previous_version_id",
                VersionFamily::Bulletins,
                previous,
                master,
            )
            .await?
        {
            previous_version_id = None;
        }
        let version_num = v.require_text("version_num", self.version_num);
        let data = v.require_payload("data", self.data);
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewBulletinVersion {
                bulletin_master_id: bulletin_master_id?,
                previous_version_id,
                version_num: version_num?,
                data: data?,
                log: log?,
            })
        })
    }
}

impl UpdateBulletinVersion {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<BulletinVersionPatch> {
        let mut v = Validator::new(lookup);
        v.reject_immutable("bulletin_master_id", &self.bulletin_master_id);
        v.reject_immutable("previous_version_id", &self.previous_version_id);
        v.reject_immutable("version_num", &self.version_num);
        v.reject_immutable("data", &self.data);
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| Some(BulletinVersionPatch { stamp: stamp? }))
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
        template: DocId,
        template_v1: DocId,
    }

    fn fixture() -> Fixture {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let template = lookup.insert_new(Collection::TemplatesMaster);
        let template_v1 = DocId::generate();
        lookup.insert_version(
            VersionFamily::Templates,
            template_v1.clone(),
            VersionLink {
                master_id: template.clone(),
                previous_version_id: None,
            },
        );
        Fixture {
            lookup,
            admin,
            template,
            template_v1,
        }
    }

    fn create_input(f: &Fixture) -> CreateBulletinMaster {
        CreateBulletinMaster {
            bulletin_name: "harvest report".into(),
            base_template_master_id: f.template.to_string(),
            base_template_version_id: f.template_v1.to_string(),
            current_version_id: None,
            status: None,
            access_config: Some(AccessConfigCreate::public()),
            log: Some(AuditLogCreate::by(&f.admin)),
        }
    }

    #[tokio::test]
    async fn status_defaults_to_draft() {
        let f = fixture();
        let bulletin = create_input(&f).validate(&f.lookup).await.unwrap();
        assert_eq!(bulletin.status, BulletinStatus::Draft);
        assert_eq!(bulletin.base_template_version_id, f.template_v1);
    }

    #[tokio::test]
    async fn dangling_base_template_is_reported_on_its_field() {
        let f = fixture();
        let mut input = create_input(&f);
        let missing = DocId::generate();
        input.base_template_master_id = missing.to_string();

        let err = input.validate(&f.lookup).await.unwrap_err();
        let errors = err.field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "base_template_master_id");
        assert_eq!(
            errors[0].kind,
            FieldErrorKind::DanglingReference {
                collection: Collection::TemplatesMaster,
                id: missing,
            }
        );
    }

    #[tokio::test]
    async fn base_version_must_match_base_template() {
        let mut f = fixture();
        let other = f.lookup.insert_new(Collection::TemplatesMaster);
        let mut input = create_input(&f);
        input.base_template_master_id = other.to_string();

        let err = input.validate(&f.lookup).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "base_template_version_id");
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::VersionMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn switching_base_template_alone_is_checked_against_stored_version() {
        let mut f = fixture();
        let other = f.lookup.insert_new(Collection::TemplatesMaster);
        let stored = BulletinMaster {
            id: f.lookup.insert_new(Collection::BulletinsMaster),
            bulletin_name: "harvest report".into(),
            base_template_master_id: f.template.clone(),
            base_template_version_id: f.template_v1.clone(),
            current_version_id: None,
            status: BulletinStatus::Draft,
            access_config: AccessConfig::public(),
            log: AuditLog::created_by(f.admin.clone(), Utc::now()),
        };

        let err = UpdateBulletinMaster {
            base_template_master_id: Some(other.to_string()),
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

        let patch = UpdateBulletinMaster {
            status: Some(BulletinStatus::Published),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&stored, &f.lookup)
        .await
        .unwrap();
        assert_eq!(patch.status, Some(BulletinStatus::Published));
        assert!(patch.base_template_master_id.is_none());
    }

    #[tokio::test]
    async fn bulletin_version_data_is_immutable() {
        let f = fixture();
        let err = UpdateBulletinVersion {
            data: Some(json!({"rain": 12})),
            log: Some(AuditLogUpdate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&f.lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "data");
        assert_eq!(err.field_errors()[0].kind, FieldErrorKind::ImmutableField);
    }

    #[tokio::test]
    async fn bulletin_version_needs_master_and_data() {
        let f = fixture();
        let err = CreateBulletinVersion {
            version_num: "1".into(),
            log: Some(AuditLogCreate::by(&f.admin)),
            ..Default::default()
        }
        .validate(&f.lookup)
        .await
        .unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["bulletin_master_id", "data"]);
    }
}
