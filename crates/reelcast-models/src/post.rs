//! Reel posts and their lifecycle status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{PostId, TemplateId};

/// Lifecycle status of a reel post.
///
/// The only legal transitions are
/// `queued → capturing → processing → {ready | failed}` plus
/// `capturing → failed`. `ready` and `failed` are terminal; a new capture
/// requires a new post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Waiting in the capture queue
    #[default]
    Queued,
    /// Camera capture in progress
    Capturing,
    /// Portrait crop / overlay / headline generation in progress
    Processing,
    /// Finished output available for download and export
    Ready,
    /// Capture or processing failed
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Queued => "queued",
            PostStatus::Capturing => "capturing",
            PostStatus::Processing => "processing",
            PostStatus::Ready => "ready",
            PostStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Ready | PostStatus::Failed)
    }

    /// Whether a transition from `self` to `to` is legal.
    pub fn can_transition(&self, to: PostStatus) -> bool {
        matches!(
            (self, to),
            (PostStatus::Queued, PostStatus::Capturing)
                | (PostStatus::Capturing, PostStatus::Processing)
                | (PostStatus::Capturing, PostStatus::Failed)
                | (PostStatus::Processing, PostStatus::Ready)
                | (PostStatus::Processing, PostStatus::Failed)
                | (PostStatus::Queued, PostStatus::Failed)
        )
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated headline overlaid on the output clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Headline {
    /// Headline text.
    pub text: String,
    /// Seconds into the clip at which the headline appears.
    pub start_time: f64,
    /// Display duration in seconds.
    pub duration: f64,
}

/// A short vertical reel assembled from a captured camera clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReelPost {
    /// Unique post id.
    pub id: PostId,

    /// Template the capture request referenced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: PostStatus,

    /// Error message, set iff `status == Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Camera the clip is captured from.
    pub camera_id: String,

    /// Camera preset used for the capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,

    /// Raw clip recorded by the capture worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_clip_path: Option<String>,

    /// Portrait-cropped intermediate clip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait_clip_path: Option<String>,

    /// Final output video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Thumbnail image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,

    /// Generated headlines in display order.
    #[serde(default)]
    pub generated_headlines: Vec<Headline>,

    /// Times a download URL was issued for this post.
    #[serde(default)]
    pub download_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_completed_at: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ReelPost {
    /// Create a new queued post for a camera.
    pub fn new(camera_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::new(),
            template_id: None,
            status: PostStatus::Queued,
            error_message: None,
            camera_id: camera_id.into(),
            preset_id: None,
            source_clip_path: None,
            portrait_clip_path: None,
            output_path: None,
            thumbnail_path: None,
            generated_headlines: Vec::new(),
            download_count: 0,
            capture_started_at: None,
            capture_completed_at: None,
            processing_started_at: None,
            processing_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the originating template.
    pub fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    /// Set the camera preset.
    pub fn with_preset(mut self, preset_id: impl Into<String>) -> Self {
        self.preset_id = Some(preset_id.into());
        self
    }

    /// Capture worker picked the post up.
    pub fn begin_capture(&mut self) {
        self.status = PostStatus::Capturing;
        self.capture_started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Capture succeeded; the post now waits on processing capacity.
    pub fn complete_capture(&mut self, source_clip_path: impl Into<String>) {
        self.status = PostStatus::Processing;
        self.capture_completed_at = Some(Utc::now());
        self.source_clip_path = Some(source_clip_path.into());
        self.updated_at = Utc::now();
    }

    /// Processing worker picked the post up.
    pub fn begin_processing(&mut self) {
        self.processing_started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Processing succeeded; the post is ready for download and export.
    pub fn complete_processing(
        &mut self,
        portrait_clip_path: impl Into<String>,
        output_path: impl Into<String>,
        thumbnail_path: impl Into<String>,
        headlines: Vec<Headline>,
    ) {
        self.status = PostStatus::Ready;
        self.processing_completed_at = Some(Utc::now());
        self.portrait_clip_path = Some(portrait_clip_path.into());
        self.output_path = Some(output_path.into());
        self.thumbnail_path = Some(thumbnail_path.into());
        self.generated_headlines = headlines;
        self.updated_at = Utc::now();
    }

    /// Mark the post failed. The source clip path, if present, is retained
    /// for diagnostics.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PostStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Record an issued download URL. A usage counter, not a transition.
    pub fn record_download(&mut self) {
        self.download_count += 1;
        self.updated_at = Utc::now();
    }
}
