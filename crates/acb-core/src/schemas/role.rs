use serde::{Deserialize, Serialize};

use crate::error::{AcbResult, FieldErrorKind};
use crate::models::audit::{AuditLog, UpdateStamp};
use crate::models::role::PermissionMap;
use crate::schemas::audit::{AuditLogCreate, AuditLogUpdate, creation_log, update_stamp};
use crate::validation::{ReferenceLookup, Validator};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRole {
    pub role_name: String,
    pub description: Option<String>,
    pub permissions: PermissionMap,
    pub log: Option<AuditLogCreate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRole {
    pub role_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<PermissionMap>,
    pub log: Option<AuditLogUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub role_name: String,
    pub description: Option<String>,
    pub permissions: PermissionMap,
    pub log: AuditLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RolePatch {
    pub role_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<PermissionMap>,
    pub stamp: UpdateStamp,
}

fn check_modules<L: ReferenceLookup>(v: &mut Validator<'_, L>, permissions: &PermissionMap) {
    if permissions.keys().any(|module| module.trim().is_empty()) {
        v.push(
            "permissions",
            FieldErrorKind::InvalidValue {
                reason: "module name must not be blank".into(),
            },
        );
    }
}

impl CreateRole {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<NewRole> {
        let mut v = Validator::new(lookup);
        let role_name = v.require_text("role_name", self.role_name);
        check_modules(&mut v, &self.permissions);
        let log = creation_log(&mut v, self.log).await?;

        v.complete(|| {
            Some(NewRole {
                role_name: role_name?,
                description: self.description,
                permissions: self.permissions,
                log: log?,
            })
        })
    }
}

impl UpdateRole {
    pub async fn validate<L: ReferenceLookup>(self, lookup: &L) -> AcbResult<RolePatch> {
        let mut v = Validator::new(lookup);
        let role_name = v.non_blank("role_name", self.role_name);
        if let Some(permissions) = &self.permissions {
            check_modules(&mut v, permissions);
        }
        let stamp = update_stamp(&mut v, self.log).await?;

        v.complete(|| {
            Some(RolePatch {
                role_name,
                description: self.description,
                permissions: self.permissions,
                stamp: stamp?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::models::role::ModulePermission;
    use crate::validation::InMemoryLookup;

    #[tokio::test]
    async fn permissions_accept_short_keys() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let input: CreateRole = serde_json::from_value(serde_json::json!({
            "role_name": "editor",
            "permissions": {"bulletins": {"c": true, "r": true}},
            "log": {"creator_user_id": admin.to_string()},
        }))
        .unwrap();

        let role = input.validate(&lookup).await.unwrap();
        assert_eq!(
            role.permissions["bulletins"],
            ModulePermission {
                create: true,
                read: true,
                update: false,
                delete: false,
            }
        );
    }

    #[tokio::test]
    async fn missing_name_and_log_are_both_reported() {
        let lookup = InMemoryLookup::new();
        let err = CreateRole::default().validate(&lookup).await.unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["role_name", "log"]);
    }

    #[tokio::test]
    async fn blank_module_name_is_rejected() {
        let mut lookup = InMemoryLookup::new();
        let admin = lookup.insert_new(Collection::Users);
        let mut permissions = PermissionMap::new();
        permissions.insert(" ".into(), ModulePermission::all());

        let err = UpdateRole {
            permissions: Some(permissions),
            log: Some(AuditLogUpdate::by(&admin)),
            ..Default::default()
        }
        .validate(&lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "permissions");
    }

    #[tokio::test]
    async fn update_without_log_is_rejected() {
        let lookup = InMemoryLookup::new();
        let err = UpdateRole {
            role_name: Some("viewer".into()),
            ..Default::default()
        }
        .validate(&lookup)
        .await
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "log");
    }
}
