//! Export and publish bookkeeping for finished posts.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::info;

use reelcast_models::{
    ExportId, ExportStatus, PostId, PostStatus, ReelExport, ReelPost, ReelPostMetadata,
    ReelPublishTarget, TargetId,
};
use reelcast_store::ReelStore;

use crate::error::{EngineError, EngineResult};

const DEFAULT_TITLE_TEMPLATE: &str = "Live from camera {camera}";
const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Captured on {date}.";
const DEFAULT_HASHTAGS_TEMPLATE: &str = "#reel #live";

/// Records, per post and optional publish target, the metadata snapshot used
/// for a manual export and the posting confirmation afterwards.
pub struct ExportTracker {
    store: Arc<dyn ReelStore>,
}

impl ExportTracker {
    pub fn new(store: Arc<dyn ReelStore>) -> Self {
        Self { store }
    }

    /// Build the metadata for a post/target pair. Read-only and repeatable;
    /// template precedence is: active target's own templates, else the
    /// post's originating template, else product defaults.
    pub fn snapshot(&self, post_id: &PostId, target_id: Option<&TargetId>) -> EngineResult<ReelPostMetadata> {
        let post = self.load_post(post_id)?;
        let target = match target_id {
            Some(id) => Some(
                self.store
                    .target(id)?
                    .ok_or_else(|| EngineError::not_found(format!("target {id}")))?,
            ),
            None => None,
        };
        self.build_metadata(&post, target.as_ref())
    }

    fn build_metadata(
        &self,
        post: &ReelPost,
        target: Option<&ReelPublishTarget>,
    ) -> EngineResult<ReelPostMetadata> {
        let template = match &post.template_id {
            Some(id) => self.store.template(id)?,
            None => None,
        };

        let active_target = target.filter(|t| t.is_active);

        let title_template = active_target
            .and_then(|t| t.title_template.clone())
            .or_else(|| template.as_ref().and_then(|t| t.title_template.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE_TEMPLATE.to_string());
        let description_template = active_target
            .and_then(|t| t.description_template.clone())
            .or_else(|| template.as_ref().and_then(|t| t.description_template.clone()))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION_TEMPLATE.to_string());
        let hashtags_template = active_target
            .and_then(|t| t.hashtags_template.clone())
            .or_else(|| template.as_ref().and_then(|t| t.hashtags_template.clone()))
            .unwrap_or_else(|| DEFAULT_HASHTAGS_TEMPLATE.to_string());

        let hashtags = fill(&hashtags_template, post)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(ReelPostMetadata {
            title: fill(&title_template, post),
            description: fill(&description_template, post),
            hashtags,
        })
    }

    /// Record an export for a finished post. Fails with `InvalidState`
    /// unless the post is `ready`. The metadata is denormalized so later
    /// template edits never alter the record.
    pub fn record_export(
        &self,
        post_id: &PostId,
        target_id: Option<&TargetId>,
    ) -> EngineResult<ReelExport> {
        let post = self.load_post(post_id)?;
        if post.status != PostStatus::Ready {
            return Err(EngineError::invalid_state(format!(
                "post {post_id} is {} and cannot be exported",
                post.status
            )));
        }
        let target = match target_id {
            Some(id) => Some(
                self.store
                    .target(id)?
                    .ok_or_else(|| EngineError::not_found(format!("target {id}")))?,
            ),
            None => None,
        };
        let metadata = self.build_metadata(&post, target.as_ref())?;
        let export = ReelExport::new(post.id.clone(), target_id.cloned(), metadata);
        self.store.insert_export(export.clone())?;
        counter!("tracker_exports_recorded").increment(1);
        Ok(export)
    }

    /// Confirm an export was posted. Fails with `InvalidState` if the export
    /// is not currently `exported` (so a second call is rejected).
    pub fn mark_posted(
        &self,
        export_id: &ExportId,
        platform_url: impl Into<String>,
    ) -> EngineResult<ReelExport> {
        let mut export = self
            .store
            .export(export_id)?
            .ok_or_else(|| EngineError::not_found(format!("export {export_id}")))?;
        if export.status != ExportStatus::Exported {
            return Err(EngineError::invalid_state(format!(
                "export {export_id} is {} and cannot be marked posted",
                export.status
            )));
        }
        export.mark_posted(platform_url);
        self.store.update_export(export.clone())?;
        info!(export_id = %export_id, "Export confirmed posted");
        Ok(export)
    }

    /// Issue a download URL for a finished post, incrementing its download
    /// counter. A usage counter, not a state transition.
    pub fn issue_download(&self, post_id: &PostId) -> EngineResult<String> {
        let mut post = self.load_post(post_id)?;
        if post.status != PostStatus::Ready {
            return Err(EngineError::invalid_state(format!(
                "post {post_id} is {} and has no downloadable output",
                post.status
            )));
        }
        let output_path = post.output_path.clone().ok_or_else(|| {
            EngineError::invalid_state(format!("post {post_id} is ready but has no output"))
        })?;
        post.record_download();
        self.store.update_post(post)?;
        Ok(format!("/downloads{output_path}"))
    }

    fn load_post(&self, post_id: &PostId) -> EngineResult<ReelPost> {
        self.store
            .post(post_id)?
            .ok_or_else(|| EngineError::not_found(format!("post {post_id}")))
    }
}

/// Substitute `{camera}` and `{date}` placeholders.
fn fill(template: &str, post: &ReelPost) -> String {
    template
        .replace("{camera}", &post.camera_id)
        .replace("{date}", &Utc::now().format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcast_models::{Headline, Platform, ReelTemplate};
    use reelcast_store::MemoryStore;

    fn ready_post(store: &MemoryStore, camera: &str) -> PostId {
        let mut post = ReelPost::new(camera);
        post.begin_capture();
        post.complete_capture("/clips/raw.mp4");
        post.begin_processing();
        post.complete_processing(
            "/clips/portrait.mp4",
            "/clips/out.mp4",
            "/clips/thumb.jpg",
            vec![Headline {
                text: "Live Now".into(),
                start_time: 0.0,
                duration: 2.0,
            }],
        );
        let id = post.id.clone();
        store.insert_post(post).unwrap();
        id
    }

    fn setup() -> (Arc<MemoryStore>, ExportTracker) {
        let store = Arc::new(MemoryStore::new());
        let tracker = ExportTracker::new(store.clone());
        (store, tracker)
    }

    #[test]
    fn test_snapshot_uses_product_defaults() {
        let (store, tracker) = setup();
        let post_id = ready_post(&store, "cam-7");

        let meta = tracker.snapshot(&post_id, None).unwrap();
        assert_eq!(meta.title, "Live from camera cam-7");
        assert_eq!(meta.hashtags, vec!["#reel", "#live"]);
    }

    #[test]
    fn test_snapshot_prefers_active_target_templates() {
        let (store, tracker) = setup();
        let post_id = ready_post(&store, "cam-7");

        let mut target = ReelPublishTarget::new(Platform::YoutubeShorts, "main channel");
        target.title_template = Some("Shorts: {camera}".into());
        let target_id = target.id.clone();
        store.insert_target(target).unwrap();

        let meta = tracker.snapshot(&post_id, Some(&target_id)).unwrap();
        assert_eq!(meta.title, "Shorts: cam-7");
    }

    #[test]
    fn test_snapshot_inactive_target_falls_back() {
        let (store, tracker) = setup();

        let mut tpl = ReelTemplate::new("lobby", 30);
        tpl.title_template = Some("Lobby live ({camera})".into());
        let tpl_id = tpl.id.clone();
        store.insert_template(tpl).unwrap();

        let mut post = ReelPost::new("cam-2").with_template(tpl_id);
        post.begin_capture();
        post.complete_capture("/clips/raw.mp4");
        post.begin_processing();
        post.complete_processing("/p.mp4", "/o.mp4", "/t.jpg", vec![]);
        let post_id = post.id.clone();
        store.insert_post(post).unwrap();

        let mut target = ReelPublishTarget::new(Platform::Tiktok, "old account");
        target.title_template = Some("never used".into());
        target.deactivate();
        let target_id = target.id.clone();
        store.insert_target(target).unwrap();

        let meta = tracker.snapshot(&post_id, Some(&target_id)).unwrap();
        assert_eq!(meta.title, "Lobby live (cam-2)");
    }

    #[test]
    fn test_record_export_requires_ready() {
        let (store, tracker) = setup();
        let mut post = ReelPost::new("cam-1");
        post.begin_capture();
        post.complete_capture("/clips/raw.mp4"); // status: processing
        let post_id = post.id.clone();
        store.insert_post(post).unwrap();

        assert!(matches!(
            tracker.record_export(&post_id, None),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn test_record_export_and_mark_posted() {
        let (store, tracker) = setup();
        let post_id = ready_post(&store, "cam-7");

        let export = tracker.record_export(&post_id, None).unwrap();
        assert_eq!(export.status, ExportStatus::Exported);

        let posted = tracker
            .mark_posted(&export.id, "https://youtube.com/shorts/abc")
            .unwrap();
        assert_eq!(posted.status, ExportStatus::Posted);
        assert!(posted.posted_at.is_some());

        // marking a posted export again is rejected
        assert!(matches!(
            tracker.mark_posted(&export.id, "https://elsewhere"),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn test_export_snapshot_survives_template_edits() {
        let (store, tracker) = setup();
        let mut tpl = ReelTemplate::new("lobby", 30);
        tpl.title_template = Some("Before edit {camera}".into());
        let tpl_id = tpl.id.clone();
        store.insert_template(tpl.clone()).unwrap();

        let mut post = ReelPost::new("cam-1").with_template(tpl_id.clone());
        post.begin_capture();
        post.complete_capture("/r.mp4");
        post.begin_processing();
        post.complete_processing("/p.mp4", "/o.mp4", "/t.jpg", vec![]);
        let post_id = post.id.clone();
        store.insert_post(post).unwrap();

        let export = tracker.record_export(&post_id, None).unwrap();

        tpl.title_template = Some("After edit".into());
        tpl.updated_at = Utc::now();
        store.update_template(tpl).unwrap();

        let stored = store.export(&export.id).unwrap().unwrap();
        assert_eq!(stored.title, "Before edit cam-1");
    }

    #[test]
    fn test_issue_download_increments_counter() {
        let (store, tracker) = setup();
        let post_id = ready_post(&store, "cam-7");

        let url = tracker.issue_download(&post_id).unwrap();
        assert_eq!(url, "/downloads/clips/out.mp4");
        tracker.issue_download(&post_id).unwrap();
        assert_eq!(store.post(&post_id).unwrap().unwrap().download_count, 2);
    }

    #[test]
    fn test_issue_download_requires_ready() {
        let (store, tracker) = setup();
        let post = ReelPost::new("cam-1");
        let post_id = post.id.clone();
        store.insert_post(post).unwrap();
        assert!(matches!(
            tracker.issue_download(&post_id),
            Err(EngineError::InvalidState(_))
        ));
    }
}
