//! In-memory reference implementation of [`ReelStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;
use tracing::{debug, info};

use reelcast_models::{
    ExportId, PostId, PostStatus, ReelExport, ReelPost, ReelPublishTarget, ReelTemplate, TargetId,
    TemplateId,
};

use crate::error::{StoreError, StoreResult};
use crate::ReelStore;

/// Lock-based in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<HashMap<PostId, ReelPost>>,
    templates: RwLock<HashMap<TemplateId, ReelTemplate>>,
    targets: RwLock<HashMap<TargetId, ReelPublishTarget>>,
    exports: RwLock<HashMap<ExportId, ReelExport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(lock: &RwLock<T>) -> StoreResult<std::sync::RwLockReadGuard<'_, T>> {
        lock.read().map_err(|_| StoreError::backend("store lock poisoned"))
    }

    fn write<T>(lock: &RwLock<T>) -> StoreResult<std::sync::RwLockWriteGuard<'_, T>> {
        lock.write().map_err(|_| StoreError::backend("store lock poisoned"))
    }
}

impl ReelStore for MemoryStore {
    fn insert_post(&self, post: ReelPost) -> StoreResult<()> {
        let mut posts = Self::write(&self.posts)?;
        if posts.contains_key(&post.id) {
            return Err(StoreError::already_exists(format!("post {}", post.id)));
        }
        counter!("store_posts_created").increment(1);
        info!(post_id = %post.id, camera_id = %post.camera_id, "Created post record");
        posts.insert(post.id.clone(), post);
        Ok(())
    }

    fn post(&self, id: &PostId) -> StoreResult<Option<ReelPost>> {
        Ok(Self::read(&self.posts)?.get(id).cloned())
    }

    fn update_post(&self, post: ReelPost) -> StoreResult<()> {
        let mut posts = Self::write(&self.posts)?;
        match posts.get_mut(&post.id) {
            Some(slot) => {
                debug!(post_id = %post.id, status = %post.status, "Updated post record");
                *slot = post;
                Ok(())
            }
            None => Err(StoreError::not_found(format!("post {}", post.id))),
        }
    }

    fn delete_post(&self, id: &PostId) -> StoreResult<()> {
        let mut posts = Self::write(&self.posts)?;
        match posts.remove(id) {
            Some(_) => {
                counter!("store_posts_deleted").increment(1);
                info!(post_id = %id, "Deleted post record");
                Ok(())
            }
            None => Err(StoreError::not_found(format!("post {id}"))),
        }
    }

    fn posts(&self, status: Option<PostStatus>, limit: Option<usize>) -> StoreResult<Vec<ReelPost>> {
        let posts = Self::read(&self.posts)?;
        let mut out: Vec<ReelPost> = posts
            .values()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn insert_template(&self, template: ReelTemplate) -> StoreResult<()> {
        let mut templates = Self::write(&self.templates)?;
        if templates.contains_key(&template.id) {
            return Err(StoreError::already_exists(format!("template {}", template.id)));
        }
        info!(template_id = %template.id, name = %template.name, "Created template");
        templates.insert(template.id.clone(), template);
        Ok(())
    }

    fn template(&self, id: &TemplateId) -> StoreResult<Option<ReelTemplate>> {
        Ok(Self::read(&self.templates)?.get(id).cloned())
    }

    fn update_template(&self, template: ReelTemplate) -> StoreResult<()> {
        let mut templates = Self::write(&self.templates)?;
        match templates.get_mut(&template.id) {
            Some(slot) => {
                *slot = template;
                Ok(())
            }
            None => Err(StoreError::not_found(format!("template {}", template.id))),
        }
    }

    fn templates(&self) -> StoreResult<Vec<ReelTemplate>> {
        let mut out: Vec<ReelTemplate> = Self::read(&self.templates)?.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    fn insert_target(&self, target: ReelPublishTarget) -> StoreResult<()> {
        let mut targets = Self::write(&self.targets)?;
        if targets.contains_key(&target.id) {
            return Err(StoreError::already_exists(format!("target {}", target.id)));
        }
        info!(target_id = %target.id, platform = %target.platform, "Created publish target");
        targets.insert(target.id.clone(), target);
        Ok(())
    }

    fn target(&self, id: &TargetId) -> StoreResult<Option<ReelPublishTarget>> {
        Ok(Self::read(&self.targets)?.get(id).cloned())
    }

    fn update_target(&self, target: ReelPublishTarget) -> StoreResult<()> {
        let mut targets = Self::write(&self.targets)?;
        match targets.get_mut(&target.id) {
            Some(slot) => {
                *slot = target;
                Ok(())
            }
            None => Err(StoreError::not_found(format!("target {}", target.id))),
        }
    }

    fn targets(&self) -> StoreResult<Vec<ReelPublishTarget>> {
        let mut out: Vec<ReelPublishTarget> = Self::read(&self.targets)?.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    fn insert_export(&self, export: ReelExport) -> StoreResult<()> {
        let mut exports = Self::write(&self.exports)?;
        if exports.contains_key(&export.id) {
            return Err(StoreError::already_exists(format!("export {}", export.id)));
        }
        counter!("store_exports_created").increment(1);
        info!(export_id = %export.id, post_id = %export.post_id, "Recorded export");
        exports.insert(export.id.clone(), export);
        Ok(())
    }

    fn export(&self, id: &ExportId) -> StoreResult<Option<ReelExport>> {
        Ok(Self::read(&self.exports)?.get(id).cloned())
    }

    fn update_export(&self, export: ReelExport) -> StoreResult<()> {
        let mut exports = Self::write(&self.exports)?;
        match exports.get_mut(&export.id) {
            Some(slot) => {
                *slot = export;
                Ok(())
            }
            None => Err(StoreError::not_found(format!("export {}", export.id))),
        }
    }

    fn exports_for_post(&self, post_id: &PostId) -> StoreResult<Vec<ReelExport>> {
        let exports = Self::read(&self.exports)?;
        let mut out: Vec<ReelExport> = exports
            .values()
            .filter(|e| &e.post_id == post_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.exported_at.cmp(&b.exported_at));
        Ok(out)
    }
}
