//! Reelcast pipeline engine.
//!
//! This crate provides:
//! - Capture-request admission (priority + expiry queue)
//! - The post lifecycle scheduler (`queued -> capturing -> processing ->
//!   ready | failed`) with camera exclusivity and bounded processing
//! - Export/publish bookkeeping per platform target
//! - The `ReelService` facade the API layer calls into

pub mod config;
pub mod error;
pub mod queue;
pub mod resolver;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod tracker;
pub mod worker;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use queue::{CaptureQueue, DequeueOutcome};
pub use resolver::{CaptureRequest, ResolvedJobSpec, TemplateResolver};
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use scheduler::{CaptureJob, PipelineScheduler};
pub use service::{ExportUpdate, ReelService};
pub use tracker::ExportTracker;
pub use worker::{CaptureOutput, CaptureWorker, ClipProcessor, ProcessingOutput, WorkerError, WorkerResult};
