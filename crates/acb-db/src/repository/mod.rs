//! SurrealDB implementations of the repository traits from `acb-core`.
//!
//! Every repository validates its input through
//! [`SurrealReferenceLookup`](crate::SurrealReferenceLookup) before any
//! write, so a rejected input leaves the store untouched.

pub mod bulletin;
pub mod card;
pub mod group;
pub mod review;
pub mod role;
pub(crate) mod row;
pub mod template;
pub mod user;
pub mod visual_resource;

pub use bulletin::SurrealBulletinRepository;
pub use card::SurrealCardRepository;
pub use group::SurrealGroupRepository;
pub use review::SurrealBulletinReviewRepository;
pub use role::SurrealRoleRepository;
pub use template::SurrealTemplateRepository;
pub use user::SurrealUserRepository;
pub use visual_resource::SurrealVisualResourceRepository;
