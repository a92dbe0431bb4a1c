//! ACB Core — domain models, validation schemas and repository traits
//! for the bulletin/template authoring store.
//!
//! Two layers live here:
//! - the entity layer ([`models`]): persisted records and their
//!   embedded values, which double as the Read shape of every entity;
//! - the schema layer ([`schemas`]): Create and Update inputs over plain
//!   string identifiers, validated against the store through an injected
//!   [`validation::ReferenceLookup`] before anything is written.
//!
//! Storage itself is behind the async traits in [`repository`].

pub mod collection;
pub mod error;
pub mod id;
pub mod models;
pub mod repository;
pub mod schemas;
pub mod validation;

pub use collection::{Collection, VersionFamily};
pub use error::{AcbError, AcbResult, FieldError, FieldErrorKind, ValidationErrors};
pub use id::DocId;
