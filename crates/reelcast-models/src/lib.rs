//! Shared data models for the Reelcast backend.
//!
//! This crate provides Serde-serializable types for:
//! - Capture templates and AI/overlay configuration
//! - Reel posts and their lifecycle status
//! - Capture queue items (priority + expiry)
//! - Publish targets and export records

pub mod export;
pub mod ids;
pub mod post;
pub mod queue_item;
pub mod template;

// Re-export common types
pub use export::{ExportStatus, Platform, ReelExport, ReelPostMetadata, ReelPublishTarget};
pub use ids::{ExportId, PostId, QueueItemId, TargetId, TemplateId};
pub use post::{Headline, PostStatus, ReelPost};
pub use queue_item::{CaptureQueueItem, QueueItemStatus};
pub use template::{AiConfig, OverlayStyle, PanConfig, PanDirection, PublishMode, ReelTemplate};
