//! Integration tests for the Role and Group repositories using in-memory
//! SurrealDB.

use acb_core::models::role::{ModulePermission, PermissionMap};
use acb_core::repository::{GroupRepository, Pagination, RoleRepository, UserRepository};
use acb_core::schemas::group::{
    CreateGroup, GroupMemberInput, RemoveMemberInput, UpdateGroup, UserAccessInput,
};
use acb_core::schemas::role::{CreateRole, UpdateRole};
use acb_core::schemas::user::CreateUser;
use acb_core::schemas::{AuditLogCreate, AuditLogUpdate};
use acb_core::{AcbError, DocId, FieldErrorKind};
use acb_db::repository::{SurrealGroupRepository, SurrealRoleRepository, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

struct Fixture {
    db: Surreal<Db>,
    admin: DocId,
    editor: DocId,
    role: DocId,
}

/// In-memory DB with an admin, a second user and an "editor" role.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    acb_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let admin = users
        .create(CreateUser {
            ext_id: "auth0|admin".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let editor = users
        .create(CreateUser {
            ext_id: "auth0|editor".into(),
            log: Some(AuditLogCreate::by(&admin.id)),
            ..Default::default()
        })
        .await
        .unwrap();

    let role = SurrealRoleRepository::new(db.clone())
        .create(editor_role(&admin.id))
        .await
        .unwrap();

    Fixture {
        db,
        admin: admin.id,
        editor: editor.id,
        role: role.id,
    }
}

fn editor_role(admin: &DocId) -> CreateRole {
    let mut permissions = PermissionMap::new();
    permissions.insert("bulletins".into(), ModulePermission::all());
    permissions.insert("templates".into(), ModulePermission::read_only());
    CreateRole {
        role_name: "editor".into(),
        description: Some("Edits bulletins".into()),
        permissions,
        log: Some(AuditLogCreate::by(admin)),
    }
}

fn group(name: &str, admin: &DocId, members: Vec<UserAccessInput>) -> CreateGroup {
    CreateGroup {
        group_name: name.into(),
        country: "CO".into(),
        description: None,
        users_access: members,
        log: Some(AuditLogCreate::by(admin)),
    }
}

#[tokio::test]
async fn role_round_trips_permissions() {
    let f = setup().await;
    let repo = SurrealRoleRepository::new(f.db.clone());

    let role = repo.get_by_name("editor").await.unwrap();
    assert_eq!(role.id, f.role);
    assert_eq!(role.permissions["bulletins"], ModulePermission::all());
    assert!(role.permissions["templates"].read);
    assert!(!role.permissions["templates"].delete);
}

#[tokio::test]
async fn duplicate_role_name_rejected() {
    let f = setup().await;
    let repo = SurrealRoleRepository::new(f.db.clone());

    let err = repo.create(editor_role(&f.admin)).await.unwrap_err();
    match err {
        AcbError::DuplicateKey { entity, field, .. } => {
            assert_eq!(entity, "roles");
            assert_eq!(field, "role_name");
        }
        other => panic!("expected duplicate key, got {other:?}"),
    }
    assert_eq!(repo.list(Pagination::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn role_update_replaces_permissions() {
    let f = setup().await;
    let repo = SurrealRoleRepository::new(f.db.clone());

    let mut permissions = PermissionMap::new();
    permissions.insert("cards".into(), ModulePermission::read_only());
    let updated = repo
        .update(
            &f.role,
            UpdateRole {
                permissions: Some(permissions),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role_name, "editor");
    assert_eq!(updated.permissions.len(), 1);
    assert!(updated.permissions.contains_key("cards"));
    assert_eq!(updated.log.updater_id.as_ref(), Some(&f.admin));
}

#[tokio::test]
async fn group_with_members() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());

    let created = repo
        .create(group(
            "forecasters",
            &f.admin,
            vec![
                UserAccessInput::new(f.editor.to_string(), f.role.to_string()),
                UserAccessInput::new(f.editor.to_string(), f.role.to_string()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(created.users_access.len(), 1, "duplicate pairs collapse");
    assert_eq!(created.users_access[0].user_id, f.editor);

    let fetched = repo.get_by_name("forecasters").await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn dangling_member_is_not_persisted() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());

    let err = repo
        .create(group(
            "ghosts",
            &f.admin,
            vec![UserAccessInput::new(
                DocId::generate().to_string(),
                f.role.to_string(),
            )],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err.field_errors()[0].kind,
        FieldErrorKind::DanglingReference { .. }
    ));
    assert_eq!(err.field_errors()[0].field, "users_access[0].user_id");
    assert_eq!(repo.list(Pagination::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn add_and_remove_members() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());
    let created = repo.create(group("analysts", &f.admin, vec![])).await.unwrap();

    let member = || GroupMemberInput {
        member: Some(UserAccessInput::new(
            f.editor.to_string(),
            f.role.to_string(),
        )),
        log: Some(AuditLogUpdate::by(&f.admin)),
    };
    repo.add_member(&created.id, member()).await.unwrap();
    let grown = repo.add_member(&created.id, member()).await.unwrap();
    assert_eq!(grown.users_access.len(), 1);
    assert!(grown.log.updated_at.is_some());

    let shrunk = repo
        .remove_member(
            &created.id,
            RemoveMemberInput {
                user_id: f.editor.to_string(),
                log: Some(AuditLogUpdate::by(&f.admin)),
            },
        )
        .await
        .unwrap();
    assert!(shrunk.users_access.is_empty());

    let err = repo
        .remove_member(
            &created.id,
            RemoveMemberInput {
                user_id: f.editor.to_string(),
                log: Some(AuditLogUpdate::by(&f.admin)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AcbError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_member_additions_are_all_kept() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());
    let created = repo.create(group("analysts", &f.admin, vec![])).await.unwrap();

    let member = |user: &DocId| GroupMemberInput {
        member: Some(UserAccessInput::new(user.to_string(), f.role.to_string())),
        log: Some(AuditLogUpdate::by(&f.admin)),
    };
    let (first, second) = tokio::join!(
        repo.add_member(&created.id, member(&f.admin)),
        repo.add_member(&created.id, member(&f.editor)),
    );
    first.unwrap();
    second.unwrap();

    let stored = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(stored.users_access.len(), 2);
    assert!(stored.users_access.iter().any(|a| a.user_id == f.admin));
    assert!(stored.users_access.iter().any(|a| a.user_id == f.editor));
}

#[tokio::test]
async fn deleted_member_blocks_update_but_can_be_removed() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());
    let created = repo
        .create(group(
            "ops",
            &f.admin,
            vec![UserAccessInput::new(
                f.editor.to_string(),
                f.role.to_string(),
            )],
        ))
        .await
        .unwrap();

    SurrealUserRepository::new(f.db.clone())
        .delete(&f.editor)
        .await
        .unwrap();

    let err = repo
        .update(
            &created.id,
            UpdateGroup {
                users_access: Some(
                    created
                        .users_access
                        .iter()
                        .map(|a| UserAccessInput::new(a.user_id.to_string(), a.role_id.to_string()))
                        .collect(),
                ),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.field_errors()[0].field, "users_access[0].user_id");

    let cleaned = repo
        .remove_member(
            &created.id,
            RemoveMemberInput {
                user_id: f.editor.to_string(),
                log: Some(AuditLogUpdate::by(&f.admin)),
            },
        )
        .await
        .unwrap();
    assert!(cleaned.users_access.is_empty());
}

#[tokio::test]
async fn rename_group_keeps_members() {
    let f = setup().await;
    let repo = SurrealGroupRepository::new(f.db.clone());
    let created = repo
        .create(group(
            "old-name",
            &f.admin,
            vec![UserAccessInput::new(
                f.editor.to_string(),
                f.role.to_string(),
            )],
        ))
        .await
        .unwrap();

    let renamed = repo
        .update(
            &created.id,
            UpdateGroup {
                group_name: Some("new-name".into()),
                log: Some(AuditLogUpdate::by(&f.admin)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(renamed.group_name, "new-name");
    assert_eq!(renamed.users_access, created.users_access);
}
