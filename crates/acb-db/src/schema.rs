//! Schema definitions and migration runner for SurrealDB.
//!
//! Every collection is a SCHEMAFULL table except `bulletin_reviews`,
//! whose comment threads nest to arbitrary depth. Identifiers are stored
//! as strings, enums as lowercase strings with ASSERT constraints, and
//! the audit log and access configuration are flattened into columns.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

/// Unique indexes as (index, table, field). Violations of these are
/// reported as duplicate keys.
const UNIQUE_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_users_ext_id", "users", "ext_id"),
    ("idx_roles_role_name", "roles", "role_name"),
    ("idx_groups_group_name", "groups", "group_name"),
    ("idx_templates_master_template_name", "templates_master", "template_name"),
];

pub(crate) fn unique_index(name: &str) -> Option<(&'static str, &'static str)> {
    UNIQUE_INDEXES
        .iter()
        .find(|(index, _, _)| *index == name)
        .map(|(_, table, field)| (*table, *field))
}

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE users SCHEMAFULL;
DEFINE FIELD ext_id ON TABLE users TYPE string;
DEFINE FIELD is_active ON TABLE users TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE users TYPE datetime;
DEFINE FIELD creator_id ON TABLE users TYPE string;
DEFINE FIELD updated_at ON TABLE users TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE users TYPE option<string>;
DEFINE INDEX idx_users_ext_id ON TABLE users COLUMNS ext_id UNIQUE;

-- =======================================================================
-- Roles
-- =======================================================================
DEFINE TABLE roles SCHEMAFULL;
DEFINE FIELD role_name ON TABLE roles TYPE string;
DEFINE FIELD description ON TABLE roles TYPE option<string>;
DEFINE FIELD permissions ON TABLE roles TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE roles TYPE datetime;
DEFINE FIELD creator_id ON TABLE roles TYPE string;
DEFINE FIELD updated_at ON TABLE roles TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE roles TYPE option<string>;
DEFINE INDEX idx_roles_role_name ON TABLE roles COLUMNS role_name UNIQUE;

-- =======================================================================
-- Groups
-- =======================================================================
DEFINE TABLE groups SCHEMAFULL;
DEFINE FIELD group_name ON TABLE groups TYPE string;
DEFINE FIELD country ON TABLE groups TYPE string;
DEFINE FIELD description ON TABLE groups TYPE option<string>;
DEFINE FIELD users_access ON TABLE groups TYPE array<object> DEFAULT [];
DEFINE FIELD users_access[*].user_id ON TABLE groups TYPE string;
DEFINE FIELD users_access[*].role_id ON TABLE groups TYPE string;
DEFINE FIELD created_at ON TABLE groups TYPE datetime;
DEFINE FIELD creator_id ON TABLE groups TYPE string;
DEFINE FIELD updated_at ON TABLE groups TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE groups TYPE option<string>;
DEFINE INDEX idx_groups_group_name ON TABLE groups \
    COLUMNS group_name UNIQUE;

-- =======================================================================
-- Templates (master + versions)
-- =======================================================================
DEFINE TABLE templates_master SCHEMAFULL;
DEFINE FIELD template_name ON TABLE templates_master TYPE string;
DEFINE FIELD description ON TABLE templates_master TYPE option<string>;
DEFINE FIELD status ON TABLE templates_master TYPE string \
    ASSERT $value IN ['active', 'archived'];
DEFINE FIELD current_version_id ON TABLE templates_master \
    TYPE option<string>;
DEFINE FIELD access_type ON TABLE templates_master TYPE string \
    ASSERT $value IN ['public', 'private', 'restricted'];
DEFINE FIELD allowed_groups ON TABLE templates_master \
    TYPE array<string> DEFAULT [];
DEFINE FIELD created_at ON TABLE templates_master TYPE datetime;
DEFINE FIELD creator_id ON TABLE templates_master TYPE string;
DEFINE FIELD updated_at ON TABLE templates_master TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE templates_master TYPE option<string>;
DEFINE INDEX idx_templates_master_template_name ON TABLE templates_master \
    COLUMNS template_name UNIQUE;

DEFINE TABLE templates_versions SCHEMAFULL;
DEFINE FIELD template_master_id ON TABLE templates_versions TYPE string;
DEFINE FIELD previous_version_id ON TABLE templates_versions \
    TYPE option<string>;
DEFINE FIELD version_num ON TABLE templates_versions TYPE string;
DEFINE FIELD commit_message ON TABLE templates_versions TYPE string;
DEFINE FIELD content ON TABLE templates_versions TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE templates_versions TYPE datetime;
DEFINE FIELD creator_id ON TABLE templates_versions TYPE string;
DEFINE FIELD updated_at ON TABLE templates_versions TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE templates_versions TYPE option<string>;
DEFINE INDEX idx_templates_versions_master ON TABLE templates_versions \
    COLUMNS template_master_id;

-- =======================================================================
-- Bulletins (master + versions)
-- =======================================================================
DEFINE TABLE bulletins_master SCHEMAFULL;
DEFINE FIELD bulletin_name ON TABLE bulletins_master TYPE string;
DEFINE FIELD base_template_master_id ON TABLE bulletins_master TYPE string;
DEFINE FIELD base_template_version_id ON TABLE bulletins_master \
    TYPE string;
DEFINE FIELD current_version_id ON TABLE bulletins_master \
    TYPE option<string>;
DEFINE FIELD status ON TABLE bulletins_master TYPE string \
    ASSERT $value IN ['draft', 'published', 'archived'];
DEFINE FIELD access_type ON TABLE bulletins_master TYPE string \
    ASSERT $value IN ['public', 'private', 'restricted'];
DEFINE FIELD allowed_groups ON TABLE bulletins_master \
    TYPE array<string> DEFAULT [];
DEFINE FIELD created_at ON TABLE bulletins_master TYPE datetime;
DEFINE FIELD creator_id ON TABLE bulletins_master TYPE string;
DEFINE FIELD updated_at ON TABLE bulletins_master TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE bulletins_master TYPE option<string>;

DEFINE TABLE bulletins_versions SCHEMAFULL;
DEFINE FIELD bulletin_master_id ON TABLE bulletins_versions TYPE string;
DEFINE FIELD previous_version_id ON TABLE bulletins_versions \
    TYPE option<string>;
DEFINE FIELD version_num ON TABLE bulletins_versions TYPE string;
DEFINE FIELD data ON TABLE bulletins_versions TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE bulletins_versions TYPE datetime;
DEFINE FIELD creator_id ON TABLE bulletins_versions TYPE string;
DEFINE FIELD updated_at ON TABLE bulletins_versions TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE bulletins_versions TYPE option<string>;
DEFINE INDEX idx_bulletins_versions_master ON TABLE bulletins_versions \
    COLUMNS bulletin_master_id;

-- =======================================================================
-- Bulletin reviews (comment threads nest, so the table is SCHEMALESS)
-- =======================================================================
DEFINE TABLE bulletin_reviews SCHEMALESS;
DEFINE FIELD bulletin_master_id ON TABLE bulletin_reviews TYPE string;
DEFINE FIELD reviewer_user_id ON TABLE bulletin_reviews TYPE string;
DEFINE FIELD completed_at ON TABLE bulletin_reviews TYPE option<datetime>;
DEFINE FIELD comments ON TABLE bulletin_reviews TYPE array DEFAULT [];
DEFINE FIELD created_at ON TABLE bulletin_reviews TYPE datetime;
DEFINE FIELD creator_id ON TABLE bulletin_reviews TYPE string;
DEFINE FIELD updated_at ON TABLE bulletin_reviews TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE bulletin_reviews TYPE option<string>;
DEFINE INDEX idx_bulletin_reviews_master ON TABLE bulletin_reviews \
    COLUMNS bulletin_master_id;

-- =======================================================================
-- Cards
-- =======================================================================
DEFINE TABLE cards SCHEMAFULL;
DEFINE FIELD card_name ON TABLE cards TYPE string;
DEFINE FIELD card_type ON TABLE cards TYPE string;
DEFINE FIELD templates_master_ids ON TABLE cards TYPE array<string> \
    DEFAULT [];
DEFINE FIELD access_type ON TABLE cards TYPE string \
    ASSERT $value IN ['public', 'private', 'restricted'];
DEFINE FIELD allowed_groups ON TABLE cards TYPE array<string> DEFAULT [];
DEFINE FIELD content ON TABLE cards TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE cards TYPE datetime;
DEFINE FIELD creator_id ON TABLE cards TYPE string;
DEFINE FIELD updated_at ON TABLE cards TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE cards TYPE option<string>;

-- =======================================================================
-- Visual resources
-- =======================================================================
DEFINE TABLE visual_resources SCHEMAFULL;
DEFINE FIELD file_url ON TABLE visual_resources TYPE string;
DEFINE FIELD file_name ON TABLE visual_resources TYPE string;
DEFINE FIELD file_type ON TABLE visual_resources TYPE string \
    ASSERT $value IN ['image', 'icon', 'background'];
DEFINE FIELD status ON TABLE visual_resources TYPE string \
    ASSERT $value IN ['active', 'archived'];
DEFINE FIELD tags ON TABLE visual_resources TYPE array<string> DEFAULT [];
DEFINE FIELD access_type ON TABLE visual_resources TYPE string \
    ASSERT $value IN ['public', 'private', 'restricted'];
DEFINE FIELD allowed_groups ON TABLE visual_resources TYPE array<string> \
    DEFAULT [];
DEFINE FIELD created_at ON TABLE visual_resources TYPE datetime;
DEFINE FIELD creator_id ON TABLE visual_resources TYPE string;
DEFINE FIELD updated_at ON TABLE visual_resources TYPE option<datetime>;
DEFINE FIELD updater_id ON TABLE visual_resources TYPE option<string>;
";

/// Bring the bulletin store schema up to date.
///
/// Ensures the `_migration` ledger exists, then applies every migration
/// newer than the last one recorded, recording each as it lands.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("cannot define migration ledger: {e}")))?;

    let applied = applied_version(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        debug!(version = applied, "Bulletin store schema already current");
        return Ok(());
    }

    info!(
        from = applied,
        pending = pending.len(),
        "Migrating bulletin store schema"
    );
    for migration in pending {
        apply(db, migration).await?;
    }
    Ok(())
}

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map_or(0, |m| m.version))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let failed = |stage: &str, e: surrealdb::Error| {
        DbError::Migration(format!(
            "{stage} v{} ({}): {e}",
            migration.version, migration.name
        ))
    };

    db.query(migration.sql)
        .await?
        .check()
        .map_err(|e| failed("schema change", e))?;
    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| failed("ledger entry", e))?;

    info!(
        version = migration.version,
        name = migration.name,
        "Bulletin store migration applied"
    );
    Ok(())
}
