//! Engine configuration.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent processing jobs (independent of camera count)
    pub processing_concurrency: usize,
    /// Maximum capture retries before a post fails
    pub capture_max_retries: u32,
    /// Base delay for capture retry backoff (doubles each attempt)
    pub capture_retry_base_delay: Duration,
    /// Cap on the retry backoff delay
    pub capture_retry_max_delay: Duration,
    /// Deadline for a single capture attempt
    pub capture_timeout: Duration,
    /// Deadline for a processing job
    pub processing_timeout: Duration,
    /// Clip duration used when a request has no template
    pub default_clip_duration_secs: u32,
    /// Priority assigned when a request does not specify one
    pub default_priority: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            processing_concurrency: 2,
            capture_max_retries: 3,
            capture_retry_base_delay: Duration::from_secs(2),
            capture_retry_max_delay: Duration::from_secs(30),
            capture_timeout: Duration::from_secs(120),
            processing_timeout: Duration::from_secs(600),
            default_clip_duration_secs: 30,
            default_priority: 0,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            processing_concurrency: std::env::var("ENGINE_PROCESSING_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            capture_max_retries: std::env::var("ENGINE_CAPTURE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            capture_retry_base_delay: Duration::from_secs(
                std::env::var("ENGINE_CAPTURE_RETRY_BASE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            capture_retry_max_delay: Duration::from_secs(
                std::env::var("ENGINE_CAPTURE_RETRY_MAX_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            capture_timeout: Duration::from_secs(
                std::env::var("ENGINE_CAPTURE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            processing_timeout: Duration::from_secs(
                std::env::var("ENGINE_PROCESSING_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            default_clip_duration_secs: std::env::var("ENGINE_DEFAULT_CLIP_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            default_priority: std::env::var("ENGINE_DEFAULT_PRIORITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}
