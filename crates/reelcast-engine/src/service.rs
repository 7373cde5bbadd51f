//! Service facade exposing the engine operations to the API layer.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use reelcast_models::{
    CaptureQueueItem, ExportId, ExportStatus, PostId, PostStatus, ReelExport, ReelPost,
    ReelPostMetadata, ReelPublishTarget, ReelTemplate, TargetId, TemplateId,
};
use reelcast_store::ReelStore;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::resolver::{CaptureRequest, ResolveError, TemplateResolver};
use crate::scheduler::PipelineScheduler;
use crate::tracker::ExportTracker;
use crate::worker::{CaptureWorker, ClipProcessor};

/// Patch applied to an export by the operator.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportUpdate {
    pub status: ExportStatus,
    #[serde(default)]
    pub platform_url: Option<String>,
}

/// Front door for the reel pipeline: admission, queries, exports and
/// template/target administration. Constructed at service start; the
/// scheduler loop is spawned from [`ReelService::scheduler`].
pub struct ReelService {
    store: Arc<dyn ReelStore>,
    scheduler: Arc<PipelineScheduler>,
    tracker: ExportTracker,
    resolver: TemplateResolver,
    config: EngineConfig,
}

impl ReelService {
    pub fn new(
        store: Arc<dyn ReelStore>,
        capture: Arc<dyn CaptureWorker>,
        processor: Arc<dyn ClipProcessor>,
        config: EngineConfig,
    ) -> Self {
        let scheduler = Arc::new(PipelineScheduler::new(
            store.clone(),
            capture,
            processor,
            config.clone(),
        ));
        Self {
            tracker: ExportTracker::new(store.clone()),
            resolver: TemplateResolver::new(&config),
            store,
            scheduler,
            config,
        }
    }

    /// The scheduler instance, for spawning its run loop.
    pub fn scheduler(&self) -> Arc<PipelineScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Admit a capture request: resolve it against its template, create the
    /// post and enqueue the scheduling item.
    pub fn queue_capture(&self, request: CaptureRequest) -> EngineResult<ReelPost> {
        let template = match &request.template_id {
            Some(id) => {
                let tpl = self
                    .store
                    .template(id)?
                    .filter(|t| t.is_active)
                    .ok_or_else(|| EngineError::not_found(format!("active template {id}")))?;
                Some(tpl)
            }
            None => None,
        };

        let spec = self
            .resolver
            .resolve(&request, template.as_ref())
            .map_err(|e| match e {
                ResolveError::MissingCamera => {
                    EngineError::invalid_state("request names no camera and template binds none")
                }
            })?;

        let mut post = ReelPost::new(spec.camera_id.clone());
        if let Some(template_id) = &spec.template_id {
            post = post.with_template(template_id.clone());
        }
        if let Some(preset_id) = &spec.preset_id {
            post = post.with_preset(preset_id.clone());
        }
        self.store.insert_post(post.clone())?;

        let mut item = CaptureQueueItem::new(
            post.id.clone(),
            spec.camera_id.clone(),
            request.priority.unwrap_or(self.config.default_priority),
        );
        if let Some(preset_id) = &spec.preset_id {
            item = item.with_preset(preset_id.clone());
        }
        if let Some(expires_at) = request.expires_at {
            item = item.with_expiry(expires_at);
        }

        if let Err(e) = self.scheduler.admit(item, spec) {
            // admission failed; do not leave an orphaned queued post behind
            self.store.delete_post(&post.id)?;
            return Err(e);
        }
        Ok(post)
    }

    /// Cancel a capture that has not started yet. The post is removed along
    /// with its queue item.
    pub fn cancel_queued_capture(&self, post_id: &PostId) -> EngineResult<()> {
        if self.store.post(post_id)?.is_none() {
            return Err(EngineError::not_found(format!("post {post_id}")));
        }
        self.scheduler.cancel_queued(post_id)?;
        self.store.delete_post(post_id)?;
        Ok(())
    }

    /// Pending capture requests in dequeue order.
    pub fn capture_queue(&self) -> Vec<CaptureQueueItem> {
        self.scheduler.queue_snapshot()
    }

    /// Posts filtered by status, newest first.
    pub fn posts(&self, status: Option<PostStatus>, limit: Option<usize>) -> EngineResult<Vec<ReelPost>> {
        Ok(self.store.posts(status, limit)?)
    }

    pub fn post(&self, post_id: &PostId) -> EngineResult<ReelPost> {
        self.store
            .post(post_id)?
            .ok_or_else(|| EngineError::not_found(format!("post {post_id}")))
    }

    /// Delete a post. Queued posts are cancelled immediately; in-flight
    /// posts are deleted once the scheduler reconciles the advisory cancel.
    pub fn delete_post(&self, post_id: &PostId) -> EngineResult<()> {
        let post = self.post(post_id)?;
        match post.status {
            PostStatus::Queued => {
                self.scheduler.cancel_queued(post_id)?;
                self.store.delete_post(post_id)?;
            }
            PostStatus::Capturing | PostStatus::Processing => {
                self.scheduler.request_cancel(post_id);
                info!(post_id = %post_id, "Cancellation requested for in-flight post");
            }
            PostStatus::Ready | PostStatus::Failed => {
                self.store.delete_post(post_id)?;
            }
        }
        Ok(())
    }

    /// Metadata the operator would post with, for a post/target pair.
    pub fn post_metadata(
        &self,
        post_id: &PostId,
        target_id: Option<&TargetId>,
    ) -> EngineResult<ReelPostMetadata> {
        self.tracker.snapshot(post_id, target_id)
    }

    /// Record an export for a finished post.
    pub fn record_export(
        &self,
        post_id: &PostId,
        target_id: Option<&TargetId>,
    ) -> EngineResult<ReelExport> {
        self.tracker.record_export(post_id, target_id)
    }

    /// Exports recorded for a post, oldest first.
    pub fn post_exports(&self, post_id: &PostId) -> EngineResult<Vec<ReelExport>> {
        if self.store.post(post_id)?.is_none() {
            return Err(EngineError::not_found(format!("post {post_id}")));
        }
        Ok(self.store.exports_for_post(post_id)?)
    }

    /// Apply an operator update to an export. The only legal update is
    /// confirming an `exported` record as `posted`.
    pub fn update_export(&self, export_id: &ExportId, update: ExportUpdate) -> EngineResult<ReelExport> {
        match update.status {
            ExportStatus::Posted => {
                let url = update.platform_url.ok_or_else(|| {
                    EngineError::invalid_state("posting confirmation requires a platform_url")
                })?;
                self.tracker.mark_posted(export_id, url)
            }
            ExportStatus::Exported => Err(EngineError::invalid_state(
                "an export cannot be reverted to exported",
            )),
        }
    }

    /// Issue a download URL for a finished post.
    pub fn issue_download(&self, post_id: &PostId) -> EngineResult<String> {
        self.tracker.issue_download(post_id)
    }

    // Template administration

    pub fn create_template(&self, template: ReelTemplate) -> EngineResult<ReelTemplate> {
        self.store.insert_template(template.clone())?;
        Ok(template)
    }

    pub fn template(&self, id: &TemplateId) -> EngineResult<ReelTemplate> {
        self.store
            .template(id)?
            .ok_or_else(|| EngineError::not_found(format!("template {id}")))
    }

    pub fn templates(&self) -> EngineResult<Vec<ReelTemplate>> {
        Ok(self.store.templates()?)
    }

    pub fn update_template(&self, template: ReelTemplate) -> EngineResult<ReelTemplate> {
        self.store.update_template(template.clone())?;
        Ok(template)
    }

    pub fn deactivate_template(&self, id: &TemplateId) -> EngineResult<ReelTemplate> {
        let mut template = self.template(id)?;
        template.deactivate();
        self.store.update_template(template.clone())?;
        Ok(template)
    }

    // Publish-target administration

    pub fn create_target(&self, target: ReelPublishTarget) -> EngineResult<ReelPublishTarget> {
        self.store.insert_target(target.clone())?;
        Ok(target)
    }

    pub fn target(&self, id: &TargetId) -> EngineResult<ReelPublishTarget> {
        self.store
            .target(id)?
            .ok_or_else(|| EngineError::not_found(format!("target {id}")))
    }

    pub fn targets(&self) -> EngineResult<Vec<ReelPublishTarget>> {
        Ok(self.store.targets()?)
    }

    pub fn update_target(&self, target: ReelPublishTarget) -> EngineResult<ReelPublishTarget> {
        self.store.update_target(target.clone())?;
        Ok(target)
    }

    pub fn deactivate_target(&self, id: &TargetId) -> EngineResult<ReelPublishTarget> {
        let mut target = self.target(id)?;
        target.deactivate();
        self.store.update_target(target.clone())?;
        Ok(target)
    }
}
