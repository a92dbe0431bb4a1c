//! ACB Database — SurrealDB connection management, schema migrations
//! and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The store-backed reference lookup ([`SurrealReferenceLookup`])
//! - Repository implementations for the `acb-core` traits ([`repository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod lookup;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use lookup::SurrealReferenceLookup;
pub use schema::run_migrations;
