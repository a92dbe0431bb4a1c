use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::error::{AcbResult, FieldErrorKind};
use crate::id::DocId;
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::group::UserAccess;
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::{ReferenceLookup, Validator, field_path, indexed_path};

/// One membership: a user holding a role within the group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAccessInput {
    pub user_id: String,
    pub role_id: String,
}

impl UserAccessInput {
    pub fn new(user_id: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_id: role_id.into(),
        }
    }

    pub async fn validate_into<L: ReferenceLookup>(
        self,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<UserAccess>> {
        let user_id = v
            .reference(&field_path(field, "user_id"), Collection::Users, &self.user_id)
            .await?;
        let role_id = v
            .reference(&field_path(field, "role_id"), Collection::Roles, &self.role_id)
            .await?;
        Ok(user_id.zip(role_id).map(|(user_id, role_id)| UserAccess { user_id, role_id }))
    }
}

async fn validate_users_access<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    entries: Vec<UserAccessInput>,
) -> AcbResult<Vec<UserAccess>> {
    let mut users_access: Vec<UserAccess> = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        if let Some(access) = entry
            .validate_into(v, &indexed_path("users_access", i))
            .await?
            && !users_access.contains(&access)
        {
            users_access.push(access);
        }
    }
    Ok(users_access)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateGroup {
    pub group_name: String,
    pub country: String,
    pub description: Option<String>,
    pub users_access: Vec<UserAccessInput>,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateGroup {
    pub group_name: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole membership list.
    pub users_access: Option<Vec<UserAccessInput>>,
    pub log: Option<AuditLogUpdate>,
}

/// Membership change on a single group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMemberInput {
    pub member: Option<UserAccessInput>,
    pub log: Option<AuditLogUpdate>,
}

/// Removal of a user's memberships. The user is not looked up, so access
/// of a since-deleted user can still be revoked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveMemberInput {
    pub user_id: String,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub group_name: String,
    pub country: String,
    pub description: Option<String>,
    pub users_access: Vec<UserAccess>,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupPatch {
    pub group_name: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub users_access: Option<Vec<UserAccess>>,
    pub stamp: UpdateStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberChange {
    pub member: UserAccess,
    pub stamp: UpdateStamp,
}

impl CreateGroup {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewGroup> {
        let mut v = Validator::new(lookup);
        let group_name = v.require_text("group_name", self.group_name);
        let country = v.require_text("country", self.country);
        let users_access = validate_users_access(&mut v, self.users_access).await?;
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewGroup {
                group_name: group_name?,
                country: country?,
                description: self.description,
                users_access,
                log: log?,
            })
        })
    }
}

impl UpdateGroup {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<GroupPatch> {
        let mut v = Validator::new(lookup);
        let group_name = v.non_blank("group_name", self.group_name);
        let country = v.non_blank("country", self.country);
        let users_access = match self.users_access {
            Some(entries) => Some(validate_users_access(&mut v, entries).await?),
            None => None,
        };
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(GroupPatch {
                group_name,
                country,
                description: self.description,
                users_access,
                stamp: stamp?,
            })
        })
    }
}

impl GroupMemberInput {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<MemberChange> {
        let mut v = Validator::new(lookup);
        let member = match v.require("member", self.member) {
            Some(member) => member.validate_into(&mut v, "member").await?,
            None => None,
        };
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(MemberChange {
                member: member?,
                stamp: stamp?,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRemoval {
    pub user_id: DocId,
    pub stamp: UpdateStamp,
}

impl RemoveMemberInput {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<MemberRemoval> {
        let mut v = Validator::new(lookup);
        let user_id = v
            .require_text("user_id", self.user_id)
            .and_then(|raw| match DocId::parse(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    v.push("user_id", FieldErrorKind::MalformedIdentifier { value: raw });
                    None
                }
            });
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(MemberRemoval {
                user_id: user_id?,
                stamp: stamp?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::InMemoryLookup;

    #[tokio::test]
    async fn members_are_checked_and_deduplicated() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let editor = lookup.insert_new(Collection::Roles);

        let group = CreateGroup {
            group_name: "newsroom".into(),
            country: "PE".into(),
            description: None,
            users_access: vec![
                UserAccessInput::new(admin.to_string(), editor.to_string()),
                UserAccessInput::new(admin.to_string(), editor.to_string()),
            ],
            log: Some(AuditLogCreate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap();

        assert_eq!(
            group.users_access,
            vec![UserAccess {
                user_id: admin,
                role_id: editor
            }]
        );
    }

    #[tokio::test]
    async fn member_deleted_before_update_is_dangling() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let member = lookup.insert_new(Collection::Users);
        let role = lookup.insert_new(Collection::Roles);

        lookup.remove(Collection::Users, &member);

        let err = UpdateGroup {
            users_access: Some(vec![UserAccessInput::new(member.to_string(), role.to_string())]),
            log: Some(AuditLogUpdate::by(&admin)),
            ..Default::default()
        }
        .validate(&lookup)
        .await
        .unwrap_err();

        let errors = err.field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "users_access[0].user_id");
        assert_eq!(
            errors[0].kind,
            FieldErrorKind::DanglingReference {
                collection: Collection::Users,
                id: member,
            }
        );
    }

    #[tokio::test]
    async fn member_change_needs_a_member() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let err = GroupMemberInput {
            member: None,
            log: Some(AuditLogUpdate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "member");

        let err = GroupMemberInput {
            member: Some(UserAccessInput::new(admin.to_string(), DocId::generate().to_string())),
            log: Some(AuditLogUpdate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "member.role_id");
    }

    #[tokio::test]
    async fn removal_does_not_require_the_user_to_exist() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let gone = DocId::generate();

        let removal = RemoveMemberInput {
            user_id: gone.to_string(),
            log: Some(AuditLogUpdate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap();
        assert_eq!(removal.user_id, gone);

        let err = RemoveMemberInput {
            user_id: "nope".into(),
            log: Some(AuditLogUpdate::by(&admin)),
        }
        .validate(&lookup)
        .await
        .unwrap_err();
        assert!(matches!(
            err.field_errors()[0].kind,
            FieldErrorKind::MalformedIdentifier { .. }
        ));
    }
}
