//! Persistence contract for Reelcast entities.
//!
//! The durable storage engine is an external collaborator; this crate
//! defines the interface the engine consumes ([`ReelStore`]) and ships an
//! in-memory reference implementation ([`MemoryStore`]) used by the engine
//! defaults and by tests.

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use reelcast_models::{
    ExportId, PostId, PostStatus, ReelExport, ReelPost, ReelPublishTarget, ReelTemplate, TargetId,
    TemplateId,
};

/// Durable storage for posts, templates, targets and exports.
///
/// Methods are synchronous; implementations are expected to be cheap
/// in-process lookups or to front their own caching. Getters return
/// `Ok(None)` for unknown ids, updates return [`StoreError::NotFound`].
pub trait ReelStore: Send + Sync {
    // Posts
    fn insert_post(&self, post: ReelPost) -> StoreResult<()>;
    fn post(&self, id: &PostId) -> StoreResult<Option<ReelPost>>;
    fn update_post(&self, post: ReelPost) -> StoreResult<()>;
    fn delete_post(&self, id: &PostId) -> StoreResult<()>;
    /// Posts filtered by status, newest first, truncated to `limit`.
    fn posts(&self, status: Option<PostStatus>, limit: Option<usize>) -> StoreResult<Vec<ReelPost>>;

    // Templates
    fn insert_template(&self, template: ReelTemplate) -> StoreResult<()>;
    fn template(&self, id: &TemplateId) -> StoreResult<Option<ReelTemplate>>;
    fn update_template(&self, template: ReelTemplate) -> StoreResult<()>;
    fn templates(&self) -> StoreResult<Vec<ReelTemplate>>;

    // Publish targets
    fn insert_target(&self, target: ReelPublishTarget) -> StoreResult<()>;
    fn target(&self, id: &TargetId) -> StoreResult<Option<ReelPublishTarget>>;
    fn update_target(&self, target: ReelPublishTarget) -> StoreResult<()>;
    fn targets(&self) -> StoreResult<Vec<ReelPublishTarget>>;

    // Exports
    fn insert_export(&self, export: ReelExport) -> StoreResult<()>;
    fn export(&self, id: &ExportId) -> StoreResult<Option<ReelExport>>;
    fn update_export(&self, export: ReelExport) -> StoreResult<()>;
    /// Exports for a post, oldest first.
    fn exports_for_post(&self, post_id: &PostId) -> StoreResult<Vec<ReelExport>>;
}
