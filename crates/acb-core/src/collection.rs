//! Named collections and the master/version families built on them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named collection in the document store. The name doubles as the
/// storage table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Roles,
    Groups,
    TemplatesMaster,
    TemplatesVersions,
    BulletinsMaster,
    BulletinsVersions,
    BulletinReviews,
    Cards,
    VisualResources,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Users,
        Collection::Roles,
        Collection::Groups,
        Collection::TemplatesMaster,
        Collection::TemplatesVersions,
        Collection::BulletinsMaster,
        Collection::BulletinsVersions,
        Collection::BulletinReviews,
        Collection::Cards,
        Collection::VisualResources,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Roles => "roles",
            Collection::Groups => "groups",
            Collection::TemplatesMaster => "templates_master",
            Collection::TemplatesVersions => "templates_versions",
            Collection::BulletinsMaster => "bulletins_master",
            Collection::BulletinsVersions => "bulletins_versions",
            Collection::BulletinReviews => "bulletin_reviews",
            Collection::Cards => "cards",
            Collection::VisualResources => "visual_resources",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One master/version entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionFamily {
    Templates,
    Bulletins,
}

impl VersionFamily {
    pub fn master(self) -> Collection {
        match self {
            VersionFamily::Templates => Collection::TemplatesMaster,
            VersionFamily::Bulletins => Collection::BulletinsMaster,
        }
    }

    pub fn versions(self) -> Collection {
        match self {
            VersionFamily::Templates => Collection::TemplatesVersions,
            VersionFamily::Bulletins => Collection::BulletinsVersions,
        }
    }

    /// Column on a version record that points back at its master.
    pub fn master_field(self) -> &'static str {
        match self {
            VersionFamily::Templates => "template_master_id",
            VersionFamily::Bulletins => "bulletin_master_id",
        }
    }
}
