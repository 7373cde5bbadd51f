//! Capture queue items.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{PostId, QueueItemId};

/// Status of a capture queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    /// Waiting for an available capture slot
    #[default]
    Queued,
    /// Deadline passed before capture started
    Expired,
    /// Removed by the operator before capture started
    Cancelled,
}

/// Scheduling shadow of a queued [`crate::ReelPost`] (1:1, created together,
/// removed once the post leaves the `queued` state).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureQueueItem {
    /// Unique queue item id.
    pub id: QueueItemId,

    /// Owning post.
    pub post_id: PostId,

    /// Camera to capture from.
    pub camera_id: String,

    /// Camera preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,

    /// Item status.
    #[serde(default)]
    pub status: QueueItemStatus,

    /// Higher priority is served first; ties break by arrival order.
    #[serde(default)]
    pub priority: i32,

    /// Admission timestamp (FIFO tie-break key).
    pub created_at: DateTime<Utc>,

    /// Deadline after which the item must not be dequeued for execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CaptureQueueItem {
    /// Create a new queued item for a post.
    pub fn new(post_id: PostId, camera_id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: QueueItemId::new(),
            post_id,
            camera_id: camera_id.into(),
            preset_id: None,
            status: QueueItemStatus::Queued,
            priority,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Set the camera preset.
    pub fn with_preset(mut self, preset_id: impl Into<String>) -> Self {
        self.preset_id = Some(preset_id.into());
        self
    }

    /// Set the execution deadline.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the item's deadline has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}
