//! Create and Update inputs for every entity, and their validation.
//!
//! Inputs take references as plain strings. `validate` checks the whole
//! input against a [`ReferenceLookup`](crate::validation::ReferenceLookup),
//! collecting every field error, and only then yields the typed write
//! payload (`New*` for creates, `*Patch` for updates). A failed
//! validation has no side effects.
//!
//! Every Update carries a `log` naming the updater; the update time is
//! taken from the clock.

pub mod audit;
pub mod bulletin;
pub mod card;
pub mod group;
pub mod review;
pub mod role;
pub mod template;
pub mod user;
pub mod visual_resource;

pub use crate::validation::access::{AccessConfigCreate, AccessConfigUpdate};
pub use crate::validation::comment::CommentCreate;
pub use audit::{AuditLogCreate, AuditLogUpdate};
