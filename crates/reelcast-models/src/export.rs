//! Publish targets and export records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ExportId, PostId, TargetId};

/// Social platform a reel can be exported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    YoutubeShorts,
    InstagramReels,
    Tiktok,
    FacebookReels,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YoutubeShorts => "youtube_shorts",
            Platform::InstagramReels => "instagram_reels",
            Platform::Tiktok => "tiktok",
            Platform::FacebookReels => "facebook_reels",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A platform-specific export destination with its own metadata defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReelPublishTarget {
    /// Unique target id.
    pub id: TargetId,

    /// Destination platform.
    pub platform: Platform,

    /// Human-readable name (e.g. the channel/account).
    pub name: String,

    /// Default title template for this target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_template: Option<String>,

    /// Default description template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_template: Option<String>,

    /// Default hashtag template (space-separated tags).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags_template: Option<String>,

    /// Inactive targets are skipped for metadata defaults.
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl ReelPublishTarget {
    /// Create a new active target.
    pub fn new(platform: Platform, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TargetId::new(),
            platform,
            name: name.into(),
            title_template: None,
            description_template: None,
            hashtags_template: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivate the target and bump `updated_at`.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// Export lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Metadata snapshot recorded, awaiting manual posting
    #[default]
    Exported,
    /// Operator confirmed the reel was posted
    Posted,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Exported => "exported",
            ExportStatus::Posted => "posted",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Title/description/hashtags prepared for a manual post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ReelPostMetadata {
    pub title: String,
    pub description: String,
    pub hashtags: Vec<String>,
}

/// A recorded export of a finished post.
///
/// The metadata snapshot is denormalized at export time so later template
/// edits never alter historical exports. The target reference is weak: a
/// deleted target does not invalidate the record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReelExport {
    /// Unique export id.
    pub id: ExportId,

    /// Exported post.
    pub post_id: PostId,

    /// Target the export was prepared for, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,

    /// Export status.
    #[serde(default)]
    pub status: ExportStatus,

    /// URL of the published reel, set when posted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_url: Option<String>,

    /// Denormalized title.
    pub title: String,

    /// Denormalized description.
    pub description: String,

    /// Denormalized hashtags.
    #[serde(default)]
    pub hashtags: Vec<String>,

    /// When the export was recorded.
    pub exported_at: DateTime<Utc>,

    /// When posting was confirmed; set iff `status == Posted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
}

impl ReelExport {
    /// Record a new export with a metadata snapshot.
    pub fn new(post_id: PostId, target_id: Option<TargetId>, metadata: ReelPostMetadata) -> Self {
        Self {
            id: ExportId::new(),
            post_id,
            target_id,
            status: ExportStatus::Exported,
            platform_url: None,
            title: metadata.title,
            description: metadata.description,
            hashtags: metadata.hashtags,
            exported_at: Utc::now(),
            posted_at: None,
        }
    }

    /// Confirm the export was posted.
    pub fn mark_posted(&mut self, platform_url: impl Into<String>) {
        self.status = ExportStatus::Posted;
        self.platform_url = Some(platform_url.into());
        self.posted_at = Some(Utc::now());
    }
}
