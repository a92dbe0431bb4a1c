//! Domain models for the bulletin authoring store.
//!
//! Each persisted record type maps 1:1 onto a [`Collection`](crate::Collection).
//! The structs here are also the Read shape of every entity: identifiers
//! serialize as plain strings and nothing is re-validated on the way out.

pub mod access;
pub mod audit;
pub mod bulletin;
pub mod card;
pub mod group;
pub mod review;
pub mod role;
pub mod template;
pub mod user;
pub mod visual_resource;

/// Free-form JSON object carried by versions and cards.
pub type Payload = serde_json::Map<String, serde_json::Value>;
