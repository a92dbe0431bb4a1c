//! Integration tests for the User repository using in-memory SurrealDB.

use acb_core::AcbError;
use acb_core::FieldErrorKind;
use acb_core::DocId;
use acb_core::repository::{Pagination, UserRepository};
use acb_core::schemas::user::{CreateUser, UpdateUser};
use acb_core::schemas::{AuditLogCreate, AuditLogUpdate};
use acb_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    acb_db::run_migrations(&db).await.unwrap();
    db
}

fn user(ext_id: &str) -> CreateUser {
    CreateUser {
        ext_id: ext_id.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn first_user_records_itself_as_creator() {
    let repo = SurrealUserRepository::new(setup().await);

    let admin = repo.create(user("auth0|admin")).await.unwrap();

    assert_eq!(admin.ext_id, "auth0|admin");
    assert!(admin.is_active);
    assert_eq!(admin.log.creator_id, admin.id);
    assert!(admin.log.updated_at.is_none());

    let fetched = repo.get_by_ext_id("auth0|admin").await.unwrap();
    assert_eq!(fetched, admin);
}

#[tokio::test]
async fn user_created_by_another_user() {
    let repo = SurrealUserRepository::new(setup().await);
    let admin = repo.create(user("auth0|admin")).await.unwrap();

    let editor = repo
        .create(CreateUser {
            ext_id: "auth0|editor".into(),
            is_active: Some(false),
            log: Some(AuditLogCreate::by(&admin.id)),
        })
        .await
        .unwrap();

    assert!(!editor.is_active);
    assert_eq!(editor.log.creator_id, admin.id);
    assert_eq!(repo.get_by_id(&editor.id).await.unwrap(), editor);
}

#[tokio::test]
async fn unknown_creator_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);

    let err = repo
        .create(CreateUser {
            ext_id: "auth0|ghosted".into(),
            log: Some(AuditLogCreate::by(&DocId::generate())),
            ..Default::default()
        })
        .await
        .unwrap_err();

    match err {
        AcbError::Validation(errors) => assert!(matches!(
            errors.for_field("log.creator_id"),
            Some(FieldErrorKind::DanglingReference { .. })
        )),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(repo.list(Pagination::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn duplicate_ext_id_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(user("auth0|dup")).await.unwrap();

    let err = repo.create(user("auth0|dup")).await.unwrap_err();
    match err {
        AcbError::DuplicateKey { entity, field, .. } => {
            assert_eq!(entity, "users");
            assert_eq!(field, "ext_id");
        }
        other => panic!("expected duplicate key, got {other:?}"),
    }
}

#[tokio::test]
async fn update_stamps_the_audit_log() {
    let repo = SurrealUserRepository::new(setup().await);
    let admin = repo.create(user("auth0|admin")).await.unwrap();

    let updated = repo
        .update(
            &admin.id,
            UpdateUser {
                is_active: Some(false),
                log: Some(AuditLogUpdate::by(&admin.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.is_active);
    assert_eq!(updated.log.created_at, admin.log.created_at);
    assert_eq!(updated.log.updater_id.as_ref(), Some(&admin.id));
    assert!(updated.log.updated_at.is_some());
}

#[tokio::test]
async fn update_without_log_or_with_ext_id_fails() {
    let repo = SurrealUserRepository::new(setup().await);
    let admin = repo.create(user("auth0|admin")).await.unwrap();

    let err = repo
        .update(
            &admin.id,
            UpdateUser {
                ext_id: Some("auth0|other".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    let errors = err.field_errors();
    assert!(
        errors
            .iter()
            .any(|e| e.field == "ext_id" && e.kind == FieldErrorKind::ImmutableField)
    );
    assert!(
        errors
            .iter()
            .any(|e| e.field == "log" && e.kind == FieldErrorKind::MissingRequiredField)
    );

    let unchanged = repo.get_by_id(&admin.id).await.unwrap();
    assert_eq!(unchanged.ext_id, "auth0|admin");
}

#[tokio::test]
async fn delete_user_and_missing_user() {
    let repo = SurrealUserRepository::new(setup().await);
    let admin = repo.create(user("auth0|admin")).await.unwrap();

    repo.delete(&admin.id).await.unwrap();

    assert!(matches!(
        repo.get_by_id(&admin.id).await,
        Err(AcbError::NotFound { .. })
    ));
    assert!(matches!(
        repo.delete(&admin.id).await,
        Err(AcbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn list_users_with_pagination() {
    let repo = SurrealUserRepository::new(setup().await);
    for i in 0..5 {
        repo.create(user(&format!("auth0|user-{i}"))).await.unwrap();
    }

    let page1 = repo
        .list(Pagination {
            offset: 0,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 5);

    let page2 = repo
        .list(Pagination {
            offset: 3,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 2);
}
