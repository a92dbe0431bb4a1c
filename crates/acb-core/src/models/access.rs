//! Access configuration embedded in templates, bulletins, cards and
//! visual resources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Public,
    Private,
    /// Visible to the listed groups only.
    #[serde(alias = "group_restricted")]
    Restricted,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::Public => "public",
            AccessType::Private => "private",
            AccessType::Restricted => "restricted",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessType::Public),
            "private" => Ok(AccessType::Private),
            "restricted" | "group_restricted" => Ok(AccessType::Restricted),
            other => Err(format!("unknown access type: {other}")),
        }
    }
}

/// Visibility policy of a record.
///
/// `Public` implies `allowed_groups` is empty; every other access type
/// requires at least one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub access_type: AccessType,
    #[serde(default)]
    pub allowed_groups: Vec<DocId>,
}

impl AccessConfig {
    pub fn public() -> Self {
        Self {
            access_type: AccessType::Public,
            allowed_groups: Vec::new(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        match self.access_type {
            AccessType::Public => self.allowed_groups.is_empty(),
            _ => !self.allowed_groups.is_empty(),
        }
    }
}

/// Validated partial change to an [`AccessConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessConfigPatch {
    pub access_type: Option<AccessType>,
    pub allowed_groups: Option<Vec<DocId>>,
}
