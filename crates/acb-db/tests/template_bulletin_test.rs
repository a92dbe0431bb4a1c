//! Integration tests for the Template and Bulletin repositories using
//! in-memory SurrealDB.

use acb_core::models::access::AccessType;
use acb_core::models::bulletin::BulletinStatus;
use acb_core::models::template::TemplateStatus;
use acb_core::repository::{
    BulletinRepository, GroupRepository, Pagination, TemplateRepository, UserRepository,
};
use acb_core::schemas::bulletin::{CreateBulletinMaster, CreateBulletinVersion, UpdateBulletinMaster};
use acb_core::schemas::group::CreateGroup;
use acb_core::schemas::template::{
    CreateTemplateMaster, CreateTemplateVersion, UpdateTemplateMaster, UpdateTemplateVersion,
};
use acb_core::schemas::user::CreateUser;
use acb_core::schemas::{AccessConfigCreate, AccessConfigUpdate, AuditLogCreate, AuditLogUpdate};
use acb_core::{AcbError, DocId, FieldErrorKind};
use acb_db::repository::{
    SurrealBulletinRepository, SurrealGroupRepository, SurrealTemplateRepository,
    SurrealUserRepository,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

struct Fixture {
    db: Surreal<Db>,
    admin: DocId,
    group: DocId,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    acb_db::run_migrations(&db).await.unwrap();

    let admin = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            ext_id: "auth0|admin".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let group = SurrealGroupRepository::new(db.clone())
        .create(CreateGroup {
            group_name: "forecasters".into(),
            country: "CO".into(),
            log: Some(AuditLogCreate::by(&admin.id)),
            ..Default::default()
        })
        .await
        .unwrap();

    Fixture {
        db,
        admin: admin.id,
        group: group.id,
    }
}

fn template_master(name: &str, admin: &DocId) -> CreateTemplateMaster {
    CreateTemplateMaster {
        template_name: name.into(),
        description: Some("Weekly outlook".into()),
        status: Some(TemplateStatus::Active),
        access_config: Some(AccessConfigCreate::public()),
        log: Some(AuditLogCreate::by(admin)),
        ..Default::default()
    }
}

fn template_version(master: &DocId, num: &str, admin: &DocId) -> CreateTemplateVersion {
    CreateTemplateVersion {
        template_master_id: master.to_string(),
        version_num: num.into(),
        commit_message: format!("release {num}"),
        content: json!({"sections": [{"id": "s1", "blocks": []}]}),
        log: Some(AuditLogCreate::by(admin)),
        ..Default::default()
    }
}

#[tokio::test]
async fn commit_chains_versions_and_moves_current() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    assert!(master.current_version_id.is_none());

    let (after_v1, v1) = repo
        .commit_version(template_version(&master.id, "1.0.0", &f.admin))
        .await
        .unwrap();
    assert_eq!(after_v1.current_version_id.as_ref(), Some(&v1.id));
    assert!(v1.previous_version_id.is_none());

    let (after_v2, v2) = repo
        .commit_version(template_version(&master.id, "1.1.0", &f.admin))
        .await
        .unwrap();
    assert_eq!(after_v2.current_version_id.as_ref(), Some(&v2.id));
    assert_eq!(v2.previous_version_id.as_ref(), Some(&v1.id));
    assert_eq!(after_v2.log.updater_id.as_ref(), Some(&f.admin));

    let history = repo.version_history(&v2.id).await.unwrap();
    let nums: Vec<_> = history.iter().map(|v| v.version_num.as_str()).collect();
    assert_eq!(nums, ["1.1.0", "1.0.0"]);

    let listed = repo
        .list_versions(&master.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
}

#[tokio::test]
async fn commit_stamps_master_with_server_time() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();

    let backdated: DateTime<Utc> = "2001-01-01T00:00:00Z".parse().unwrap();
    let before = Utc::now();
    let mut input = template_version(&master.id, "1.0.0", &f.admin);
    input.log = Some(AuditLogCreate {
        created_at: Some(backdated),
        creator_id: f.admin.to_string(),
    });
    let (after, version) = repo.commit_version(input).await.unwrap();

    assert_eq!(version.log.created_at, backdated);
    let updated_at = after.log.updated_at.unwrap();
    assert_ne!(updated_at, backdated);
    assert!(updated_at >= before);
}

#[tokio::test]
async fn commit_fails_when_master_cannot_be_read() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    repo.commit_version(template_version(&master.id, "1.0.0", &f.admin))
        .await
        .unwrap();

    f.db.query(
        "UPDATE type::record('templates_master', $id) SET current_version_id = 'corrupt'",
    )
    .bind(("id", master.id.to_string()))
    .await
    .unwrap()
    .check()
    .unwrap();

    let err = repo
        .commit_version(template_version(&master.id, "1.1.0", &f.admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AcbError::Internal(_)));

    let mut result = f
        .db
        .query("SELECT VALUE meta::id(id) FROM templates_versions")
        .await
        .unwrap();
    let stored: Vec<String> = result.take(0).unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn duplicate_template_name_rejected() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    repo.create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();

    let err = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AcbError::DuplicateKey { ref field, .. } if field == "template_name"));
}

#[tokio::test]
async fn previous_version_from_another_master_rejected() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let a = repo.create_master(template_master("a", &f.admin)).await.unwrap();
    let b = repo.create_master(template_master("b", &f.admin)).await.unwrap();
    let a1 = repo
        .create_version(template_version(&a.id, "1", &f.admin))
        .await
        .unwrap();

    let err = repo
        .create_version(CreateTemplateVersion {
            previous_version_id: Some(a1.id.to_string()),
            ..template_version(&b.id, "1", &f.admin)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.field_errors()[0].kind,
        FieldErrorKind::VersionMismatch { .. }
    ));

    let err = repo
        .update_master(
            &b.id,
            UpdateTemplateMaster {
                current_version_id: Some(a1.id.to_string()),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.field_errors()[0].field, "current_version_id");
}

#[tokio::test]
async fn committed_content_is_immutable() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    let (_, v1) = repo
        .commit_version(template_version(&master.id, "1", &f.admin))
        .await
        .unwrap();

    let err = repo
        .update_version(
            &v1.id,
            UpdateTemplateVersion {
                content: Some(json!({"sections": []})),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.field_errors()[0].kind,
        FieldErrorKind::ImmutableField
    );

    let reworded = repo
        .update_version(
            &v1.id,
            UpdateTemplateVersion {
                commit_message: Some("first public release".into()),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reworded.commit_message, "first public release");
    assert_eq!(reworded.content, v1.content);
}

#[tokio::test]
async fn access_update_merges_with_stored_config() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(CreateTemplateMaster {
            access_config: Some(AccessConfigCreate::restricted_to([f.group.to_string()])),
            ..template_master("outlook", &f.admin)
        })
        .await
        .unwrap();
    assert_eq!(master.access_config.allowed_groups, vec![f.group.clone()]);

    let private = repo
        .update_master(
            &master.id,
            UpdateTemplateMaster {
                access_config: Some(AccessConfigUpdate {
                    access_type: Some(AccessType::Private),
                    allowed_groups: Some(vec![f.group.to_string(), f.group.to_string()]),
                }),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(private.access_config.access_type, AccessType::Private);
    assert_eq!(private.access_config.allowed_groups, vec![f.group.clone()]);

    let public = repo
        .update_master(
            &master.id,
            UpdateTemplateMaster {
                access_config: Some(AccessConfigUpdate {
                    access_type: Some(AccessType::Public),
                    allowed_groups: None,
                }),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(public.access_config.allowed_groups.is_empty());

    let err = repo
        .update_master(
            &master.id,
            UpdateTemplateMaster {
                access_config: Some(AccessConfigUpdate {
                    access_type: None,
                    allowed_groups: Some(vec![f.group.to_string()]),
                }),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.field_errors()[0].kind,
        FieldErrorKind::InvalidAccessConfig { .. }
    ));
}

#[tokio::test]
async fn deleting_master_removes_its_versions() {
    let f = setup().await;
    let repo = SurrealTemplateRepository::new(f.db.clone());
    let master = repo
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    let (_, v1) = repo
        .commit_version(template_version(&master.id, "1", &f.admin))
        .await
        .unwrap();

    repo.delete_master(&master.id).await.unwrap();

    assert!(matches!(
        repo.get_master(&master.id).await,
        Err(AcbError::NotFound { .. })
    ));
    assert!(matches!(
        repo.get_version(&v1.id).await,
        Err(AcbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn bulletin_needs_a_matching_base_template() {
    let f = setup().await;
    let templates = SurrealTemplateRepository::new(f.db.clone());
    let bulletins = SurrealBulletinRepository::new(f.db.clone());

    let outlook = templates
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    let (_, outlook_v1) = templates
        .commit_version(template_version(&outlook.id, "1", &f.admin))
        .await
        .unwrap();
    let other = templates
        .create_master(template_master("other", &f.admin))
        .await
        .unwrap();

    let bulletin = |master: &DocId| CreateBulletinMaster {
        bulletin_name: "Week 42".into(),
        base_template_master_id: master.to_string(),
        base_template_version_id: outlook_v1.id.to_string(),
        access_config: Some(AccessConfigCreate::public()),
        log: Some(AuditLogCreate::by(&f.admin)),
        ..Default::default()
    };

    let err = bulletins
        .create_master(bulletin(&DocId::generate()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.field_errors()[0].kind,
        FieldErrorKind::DanglingReference { .. }
    ));

    let err = bulletins
        .create_master(bulletin(&other.id))
        .await
        .unwrap_err();
    assert_eq!(err.field_errors()[0].field, "base_template_version_id");
    assert_eq!(
        bulletins
            .list_masters(Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );

    let created = bulletins.create_master(bulletin(&outlook.id)).await.unwrap();
    assert_eq!(created.status, BulletinStatus::Draft);
    assert_eq!(created.base_template_version_id, outlook_v1.id);
}

#[tokio::test]
async fn bulletin_versions_commit_and_publish() {
    let f = setup().await;
    let templates = SurrealTemplateRepository::new(f.db.clone());
    let bulletins = SurrealBulletinRepository::new(f.db.clone());

    let outlook = templates
        .create_master(template_master("outlook", &f.admin))
        .await
        .unwrap();
    let (_, outlook_v1) = templates
        .commit_version(template_version(&outlook.id, "1", &f.admin))
        .await
        .unwrap();
    let bulletin = bulletins
        .create_master(CreateBulletinMaster {
            bulletin_name: "Week 42".into(),
            base_template_master_id: outlook.id.to_string(),
            base_template_version_id: outlook_v1.id.to_string(),
            access_config: Some(AccessConfigCreate::public()),
            log: Some(AuditLogCreate::by(&f.admin)),
            ..Default::default()
        })
        .await
        .unwrap();

    let version = |num: &str| CreateBulletinVersion {
        bulletin_master_id: bulletin.id.to_string(),
        version_num: num.into(),
        data: json!({"s1": {"rainfall": 42}}),
        log: Some(AuditLogCreate::by(&f.admin)),
        ..Default::default()
    };
    let (_, b1) = bulletins.commit_version(version("1")).await.unwrap();
    let (master, b2) = bulletins.commit_version(version("2")).await.unwrap();
    assert_eq!(b2.previous_version_id.as_ref(), Some(&b1.id));
    assert_eq!(master.current_version_id.as_ref(), Some(&b2.id));
    assert_eq!(b2.data["s1"]["rainfall"], 42);

    let published = bulletins
        .update_master(
            &bulletin.id,
            UpdateBulletinMaster {
                status: Some(BulletinStatus::Published),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(published.status, BulletinStatus::Published);
    assert_eq!(published.current_version_id.as_ref(), Some(&b2.id));

    let history = bulletins.version_history(&b2.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].id, b1.id);
}
