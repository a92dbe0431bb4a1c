//! Repository trait definitions for data access abstraction.
//!
//! Every write takes the raw Create/Update input and validates it against
//! the store before touching it; a validation failure leaves the store
//! unchanged. Updates go through a read of the stored record first so
//! that merged values (access configuration, version ownership) are
//! checked against what is actually there.

use crate::error::AcbResult;
use crate::id::DocId;
use crate::models::{
    bulletin::{BulletinMaster, BulletinVersion},
    card::Card,
    group::Group,
    review::BulletinReview,
    role::Role,
    template::{TemplateMaster, TemplateVersion},
    user::User,
    visual_resource::VisualResource,
};
use crate::schemas::{
    bulletin::{
        CreateBulletinMaster, CreateBulletinVersion, UpdateBulletinMaster, UpdateBulletinVersion,
    },
    card::{CreateCard, UpdateCard},
    group::{CreateGroup, GroupMemberInput, RemoveMemberInput, UpdateGroup},
    review::{AddComment, CreateBulletinReview, EditComment, UpdateBulletinReview},
    role::{CreateRole, UpdateRole},
    template::{
        CreateTemplateMaster, CreateTemplateVersion, UpdateTemplateMaster, UpdateTemplateVersion,
    },
    user::{CreateUser, UpdateUser},
    visual_resource::{CreateVisualResource, UpdateVisualResource},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users, roles, groups
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = AcbResult<User>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<User>> + Send;
    fn get_by_ext_id(&self, ext_id: &str) -> impl Future<Output = AcbResult<User>> + Send;
    fn update(&self, id: &DocId, input: UpdateUser)
    -> impl Future<Output = AcbResult<User>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<User>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = AcbResult<Role>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<Role>> + Send;
    fn get_by_name(&self, role_name: &str) -> impl Future<Output = AcbResult<Role>> + Send;
    fn update(&self, id: &DocId, input: UpdateRole)
    -> impl Future<Output = AcbResult<Role>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<Role>>> + Send;
}

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = AcbResult<Group>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<Group>> + Send;
    fn get_by_name(&self, group_name: &str) -> impl Future<Output = AcbResult<Group>> + Send;
    fn update(
        &self,
        id: &DocId,
        input: UpdateGroup,
    ) -> impl Future<Output = AcbResult<Group>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<Group>>> + Send;
    /// Add a user/role pair; adding an existing pair is a no-op apart
    /// from the audit stamp.
    fn add_member(
        &self,
        id: &DocId,
        input: GroupMemberInput,
    ) -> impl Future<Output = AcbResult<Group>> + Send;
    /// Remove every pair held by the given user.
    fn remove_member(
        &self,
        id: &DocId,
        input: RemoveMemberInput,
    ) -> impl Future<Output = AcbResult<Group>> + Send;
}

// ---------------------------------------------------------------------------
// Templates and bulletins (master + version families)
// ---------------------------------------------------------------------------

pub trait TemplateRepository: Send + Sync {
    fn create_master(
        &self,
        input: CreateTemplateMaster,
    ) -> impl Future<Output = AcbResult<TemplateMaster>> + Send;
    fn get_master(&self, id: &DocId) -> impl Future<Output = AcbResult<TemplateMaster>> + Send;
    fn get_master_by_name(
        &self,
        template_name: &str,
    ) -> impl Future<Output = AcbResult<TemplateMaster>> + Send;
    fn update_master(
        &self,
        id: &DocId,
        input: UpdateTemplateMaster,
    ) -> impl Future<Output = AcbResult<TemplateMaster>> + Send;
    /// Deletes the master and all of its versions.
    fn delete_master(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list_masters(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<TemplateMaster>>> + Send;

    fn create_version(
        &self,
        input: CreateTemplateVersion,
    ) -> impl Future<Output = AcbResult<TemplateVersion>> + Send;
    fn get_version(&self, id: &DocId) -> impl Future<Output = AcbResult<TemplateVersion>> + Send;
    fn update_version(
        &self,
        id: &DocId,
        input: UpdateTemplateVersion,
    ) -> impl Future<Output = AcbResult<TemplateVersion>> + Send;
    fn list_versions(
        &self,
        master_id: &DocId,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<TemplateVersion>>> + Send;

    /// Create a version and make it the master's current version in one
    /// transaction. Without an explicit `previous_version_id` the new
    /// version chains onto the master's current one.
    fn commit_version(
        &self,
        input: CreateTemplateVersion,
    ) -> impl Future<Output = AcbResult<(TemplateMaster, TemplateVersion)>> + Send;
    /// The chain ending at `version_id`, newest first.
    fn version_history(
        &self,
        version_id: &DocId,
    ) -> impl Future<Output = AcbResult<Vec<TemplateVersion>>> + Send;
}

pub trait BulletinRepository: Send + Sync {
    fn create_master(
        &self,
        input: CreateBulletinMaster,
    ) -> impl Future<Output = AcbResult<BulletinMaster>> + Send;
    fn get_master(&self, id: &DocId) -> impl Future<Output = AcbResult<BulletinMaster>> + Send;
    fn update_master(
        &self,
        id: &DocId,
        input: UpdateBulletinMaster,
    ) -> impl Future<Output = AcbResult<BulletinMaster>> + Send;
    /// Deletes the master and all of its versions.
    fn delete_master(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list_masters(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<BulletinMaster>>> + Send;

    fn create_version(
        &self,
        input: CreateBulletinVersion,
    ) -> impl Future<Output = AcbResult<BulletinVersion>> + Send;
    fn get_version(&self, id: &DocId) -> impl Future<Output = AcbResult<BulletinVersion>> + Send;
    fn update_version(
        &self,
        id: &DocId,
        input: UpdateBulletinVersion,
    ) -> impl Future<Output = AcbResult<BulletinVersion>> + Send;
    fn list_versions(
        &self,
        master_id: &DocId,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<BulletinVersion>>> + Send;

    fn commit_version(
        &self,
        input: CreateBulletinVersion,
    ) -> impl Future<Output = AcbResult<(BulletinMaster, BulletinVersion)>> + Send;
    fn version_history(
        &self,
        version_id: &DocId,
    ) -> impl Future<Output = AcbResult<Vec<BulletinVersion>>> + Send;
}

// ---------------------------------------------------------------------------
// Cards, visual resources, reviews
// ---------------------------------------------------------------------------

pub trait CardRepository: Send + Sync {
    fn create(&self, input: CreateCard) -> impl Future<Output = AcbResult<Card>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<Card>> + Send;
    fn update(&self, id: &DocId, input: UpdateCard)
    -> impl Future<Output = AcbResult<Card>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<Card>>> + Send;
    /// Cards usable with the given template.
    fn list_for_template(
        &self,
        template_master_id: &DocId,
    ) -> impl Future<Output = AcbResult<Vec<Card>>> + Send;
}

pub trait VisualResourceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateVisualResource,
    ) -> impl Future<Output = AcbResult<VisualResource>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<VisualResource>> + Send;
    fn update(
        &self,
        id: &DocId,
        input: UpdateVisualResource,
    ) -> impl Future<Output = AcbResult<VisualResource>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<VisualResource>>> + Send;
    fn list_by_tag(&self, tag: &str) -> impl Future<Output = AcbResult<Vec<VisualResource>>> + Send;
}

pub trait BulletinReviewRepository: Send + Sync {
    fn create(
        &self,
        input: CreateBulletinReview,
    ) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
    fn get_by_id(&self, id: &DocId) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
    fn update(
        &self,
        id: &DocId,
        input: UpdateBulletinReview,
    ) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
    fn delete(&self, id: &DocId) -> impl Future<Output = AcbResult<()>> + Send;
    fn list_by_bulletin(
        &self,
        bulletin_master_id: &DocId,
        pagination: Pagination,
    ) -> impl Future<Output = AcbResult<PaginatedResult<BulletinReview>>> + Send;
    /// Append a top-level comment.
    fn add_comment(
        &self,
        id: &DocId,
        input: AddComment,
    ) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
    /// Append a reply under the comment with client id `parent_comment_id`.
    fn reply_to(
        &self,
        id: &DocId,
        parent_comment_id: &str,
        input: AddComment,
    ) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
    /// Replace the text of the comment with client id `comment_id`, at
    /// any depth.
    fn edit_comment(
        &self,
        id: &DocId,
        comment_id: &str,
        input: EditComment,
    ) -> impl Future<Output = AcbResult<BulletinReview>> + Send;
}
