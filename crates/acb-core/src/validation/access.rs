//! Access configuration rules.
//!
//! `public` access never carries groups: on create and on update the
//! group list is cleared whenever the access type is set to public. Any
//! other access type needs at least one existing group.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::Collection;
use crate::error::{AcbResult, FieldErrorKind};
use crate::id::DocId;
use crate::models::access::{AccessConfig, AccessConfigPatch, AccessType};
use crate::validation::{ReferenceLookup, Validator, field_path};

/// Access configuration as supplied on create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfigCreate {
    pub access_type: Option<AccessType>,
    pub allowed_groups: Vec<String>,
}

impl AccessConfigCreate {
    pub fn public() -> Self {
        Self {
            access_type: Some(AccessType::Public),
            allowed_groups: Vec::new(),
        }
    }

    pub fn restricted_to(groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            access_type: Some(AccessType::Restricted),
            allowed_groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Required access configuration of a create input.
    pub async fn require_into<L: ReferenceLookup>(
        input: Option<Self>,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<AccessConfig>> {
        match v.require(field, input) {
            Some(input) => input.validate_into(v, field).await,
            None => Ok(None),
        }
    }

    pub async fn validate_into<L: ReferenceLookup>(
        self,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<AccessConfig>> {
        let Some(access_type) = v.require(&field_path(field, "access_type"), self.access_type)
        else {
            return Ok(None);
        };

        if access_type == AccessType::Public {
            if !self.allowed_groups.is_empty() {
                debug!(
                    field,
                    dropped = self.allowed_groups.len(),
                    "Cleared allowed_groups on public access"
                );
            }
            return Ok(Some(AccessConfig::public()));
        }

        let groups_path = field_path(field, "allowed_groups");
        if self.allowed_groups.is_empty() {
            v.push(groups_path, missing_groups(access_type));
            return Ok(None);
        }

        let groups = v
            .references(&groups_path, Collection::Groups, &self.allowed_groups)
            .await?;
        Ok(Some(AccessConfig {
            access_type,
            allowed_groups: dedup(groups),
        }))
    }
}

/// Partial access configuration change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfigUpdate {
    pub access_type: Option<AccessType>,
    pub allowed_groups: Option<Vec<String>>,
}

impl AccessConfigUpdate {
    /// Without `access_type` the group list is neither required nor
    /// cleared; it is only checked for existence.
    pub async fn validate_into<L: ReferenceLookup>(
        self,
        v: &mut Validator<'_, L>,
        field: &str,
    ) -> AcbResult<Option<AccessConfigPatch>> {
        let groups_path = field_path(field, "allowed_groups");

        match self.access_type {
            Some(AccessType::Public) => Ok(Some(AccessConfigPatch {
                access_type: Some(AccessType::Public),
                allowed_groups: Some(Vec::new()),
            })),
            Some(access_type) => {
                let raws = self.allowed_groups.unwrap_or_default();
                if raws.is_empty() {
                    v.push(groups_path, missing_groups(access_type));
                    return Ok(None);
                }
                let groups = v
                    .references(&groups_path, Collection::Groups, &raws)
                    .await?;
                Ok(Some(AccessConfigPatch {
                    access_type: Some(access_type),
                    allowed_groups: Some(dedup(groups)),
                }))
            }
            None => {
                let allowed_groups = match self.allowed_groups {
                    Some(raws) => Some(dedup(
                        v.references(&groups_path, Collection::Groups, &raws)
                            .await?,
                    )),
                    None => None,
                };
                Ok(Some(AccessConfigPatch {
                    access_type: None,
                    allowed_groups,
                }))
            }
        }
    }
}

impl AccessConfigUpdate {
    /// Validate an optional update and merge it into the stored config.
    /// `None` means "unchanged" or "failed"; failures are recorded on `v`.
    pub async fn merge_into<L: ReferenceLookup>(
        update: Option<Self>,
        v: &mut Validator<'_, L>,
        field: &str,
        stored: &AccessConfig,
    ) -> AcbResult<Option<AccessConfig>> {
        let Some(update) = update else {
            return Ok(None);
        };
        let Some(patch) = update.validate_into(v, field).await? else {
            return Ok(None);
        };
        match stored.apply(&patch) {
            Ok(merged) => Ok(Some(merged)),
            Err(kind) => {
                v.push(field, kind);
                Ok(None)
            }
        }
    }
}

impl AccessConfig {
    /// Apply a validated patch to the stored configuration.
    ///
    /// Fails when the merged result breaks the public/groups rule, e.g.
    /// groups supplied alone against a public record.
    pub fn apply(&self, patch: &AccessConfigPatch) -> Result<AccessConfig, FieldErrorKind> {
        let access_type = patch.access_type.unwrap_or(self.access_type);
        let allowed_groups = if access_type == AccessType::Public && patch.access_type.is_some() {
            Vec::new()
        } else {
            patch
                .allowed_groups
                .clone()
                .unwrap_or_else(|| self.allowed_groups.clone())
        };

        let merged = AccessConfig {
            access_type,
            allowed_groups,
        };
        if merged.is_consistent() {
            Ok(merged)
        } else if access_type == AccessType::Public {
            Err(FieldErrorKind::InvalidAccessConfig {
                reason: "allowed_groups must be empty for public access".into(),
            })
        } else {
            Err(missing_groups(access_type))
        }
    }
}

fn missing_groups(access_type: AccessType) -> FieldErrorKind {
    FieldErrorKind::InvalidAccessConfig {
        reason: format!("allowed_groups must not be empty for {access_type} access"),
    }
}

fn dedup(ids: Vec<DocId>) -> Vec<DocId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
