//! Validation primitives shared by every schema.
//!
//! - [`validate_reference`]: the single reference check used for every
//!   foreign-key-shaped field.
//! - [`Validator`]: collects field-attributed errors across a whole input.
//! - [`access`], [`chain`], [`comment`]: access configuration rules, the
//!   master/version chain guard and comment thread shape.

pub mod access;
pub mod chain;
pub mod comment;
mod memory;
mod reference;
mod validator;

pub use memory::InMemoryLookup;
pub use reference::{ReferenceError, ReferenceLookup, VersionLink, validate_reference};
pub use validator::{Validator, field_path, indexed_path};
