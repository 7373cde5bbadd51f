//! Contracts for the external capture and processing workers.
//!
//! The engine only sequences work; actual RTSP capture and video encoding
//! happen behind these traits.

use async_trait::async_trait;
use thiserror::Error;

use reelcast_models::Headline;

use crate::resolver::ResolvedJobSpec;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure reported by a worker. Transient capture failures are retried by
/// the scheduler; everything else surfaces into the post's `error_message`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WorkerError {
    pub message: String,
}

impl WorkerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Successful capture result.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Raw clip recorded from the camera.
    pub source_clip_path: String,
}

/// Successful processing result.
#[derive(Debug, Clone)]
pub struct ProcessingOutput {
    pub portrait_clip_path: String,
    pub output_path: String,
    pub thumbnail_path: String,
    pub headlines: Vec<Headline>,
}

/// Records a source clip from a camera.
#[async_trait]
pub trait CaptureWorker: Send + Sync {
    async fn start_capture(&self, spec: &ResolvedJobSpec) -> WorkerResult<CaptureOutput>;
}

/// Turns a source clip into the final portrait output with overlays and
/// generated headlines.
#[async_trait]
pub trait ClipProcessor: Send + Sync {
    async fn process_clip(
        &self,
        source_clip_path: &str,
        spec: &ResolvedJobSpec,
    ) -> WorkerResult<ProcessingOutput>;
}
