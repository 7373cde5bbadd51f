//! Pipeline scheduler: queue admission, state transitions, worker handoff.
//!
//! One logical scheduler coordinates all state mutations behind a single
//! mutex held only for short critical sections. Long-running work (capture,
//! encoding) runs outside the lock; workers hand their result back and the
//! scheduler re-acquires the critical section to apply the transition.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::sync::{watch, Notify, Semaphore};
use tracing::{debug, error, info, warn};

use reelcast_models::{CaptureQueueItem, PostId, PostStatus, ReelPost};
use reelcast_store::ReelStore;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::queue::CaptureQueue;
use crate::resolver::ResolvedJobSpec;
use crate::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use crate::worker::{CaptureWorker, ClipProcessor, WorkerError};

/// Token handed to the capture stage for one dispatched post.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub post_id: PostId,
    pub spec: ResolvedJobSpec,
}

/// Scheduler state guarded by the critical-section mutex.
#[derive(Default)]
struct SchedState {
    queue: CaptureQueue,
    /// Cameras with an in-flight capture. Bound on `queued -> capturing`,
    /// released on leaving `capturing`.
    busy_cameras: HashSet<String>,
    /// Posts whose cancellation was requested while in flight.
    cancel_requested: HashSet<PostId>,
    /// Resolved spec snapshots for posts between admission and terminal state.
    specs: HashMap<PostId, ResolvedJobSpec>,
}

/// Drives each post through `queued -> capturing -> processing -> ready|failed`.
pub struct PipelineScheduler {
    store: Arc<dyn ReelStore>,
    capture: Arc<dyn CaptureWorker>,
    processor: Arc<dyn ClipProcessor>,
    config: EngineConfig,
    state: Mutex<SchedState>,
    processing_slots: Arc<Semaphore>,
    wake: Notify,
}

impl PipelineScheduler {
    pub fn new(
        store: Arc<dyn ReelStore>,
        capture: Arc<dyn CaptureWorker>,
        processor: Arc<dyn ClipProcessor>,
        config: EngineConfig,
    ) -> Self {
        let processing_slots = Arc::new(Semaphore::new(config.processing_concurrency));
        Self {
            store,
            capture,
            processor,
            config,
            state: Mutex::new(SchedState::default()),
            processing_slots,
            wake: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedState> {
        // a poisoned scheduler mutex means a panic mid-transition; propagate
        self.state.lock().expect("scheduler state lock poisoned")
    }

    /// Admit a queue item plus its resolved spec. Fails with `Conflict` if
    /// the queue already holds an item for the post.
    pub fn admit(&self, item: CaptureQueueItem, spec: ResolvedJobSpec) -> EngineResult<()> {
        let post_id = item.post_id.clone();
        {
            let mut state = self.lock();
            state.queue.enqueue(item)?;
            state.specs.insert(post_id.clone(), spec);
        }
        counter!("scheduler_admitted").increment(1);
        info!(post_id = %post_id, "Admitted capture request");
        self.wake.notify_one();
        Ok(())
    }

    /// Cancel a still-queued capture. Fails with `InvalidState` once capture
    /// has started.
    pub fn cancel_queued(&self, post_id: &PostId) -> EngineResult<CaptureQueueItem> {
        let mut state = self.lock();
        match state.queue.remove(post_id) {
            Some(item) => {
                state.specs.remove(post_id);
                info!(post_id = %post_id, "Cancelled queued capture");
                Ok(item)
            }
            None => Err(EngineError::invalid_state(format!(
                "capture for post {post_id} already started"
            ))),
        }
    }

    /// Request cancellation regardless of stage. Returns `true` if the post
    /// was still queued and removal was immediate; `false` if the post is in
    /// flight and the intent will be reconciled when the worker completes.
    pub fn request_cancel(&self, post_id: &PostId) -> bool {
        let mut state = self.lock();
        if state.queue.remove(post_id).is_some() {
            state.specs.remove(post_id);
            true
        } else {
            state.cancel_requested.insert(post_id.clone());
            false
        }
    }

    /// Pending queue items in dequeue order.
    pub fn queue_snapshot(&self) -> Vec<CaptureQueueItem> {
        self.lock().queue.snapshot()
    }

    /// Cameras currently bound to an in-flight capture.
    pub fn busy_cameras(&self) -> HashSet<String> {
        self.lock().busy_cameras.clone()
    }

    /// Pull the next admissible item, transition its post to `capturing` and
    /// bind the camera. Expired items found on the scan are evicted and their
    /// posts marked failed. Returns `None` when nothing is admissible.
    pub fn dispatch_next(&self) -> EngineResult<Option<CaptureJob>> {
        let (next, expired) = {
            let mut state = self.lock();
            let busy = state.busy_cameras.clone();
            let outcome = state.queue.dequeue(&busy, Utc::now());

            for item in &outcome.expired {
                state.specs.remove(&item.post_id);
                state.cancel_requested.remove(&item.post_id);
            }

            let next = match outcome.next {
                Some(item) => {
                    state.busy_cameras.insert(item.camera_id.clone());
                    let spec = state.specs.get(&item.post_id).cloned();
                    Some((item, spec))
                }
                None => None,
            };
            (next, outcome.expired)
        };

        for item in expired {
            counter!("scheduler_expired").increment(1);
            self.fail_post(
                &item.post_id,
                "capture request expired before execution",
            )?;
        }

        let Some((item, spec)) = next else {
            return Ok(None);
        };

        let spec = match spec {
            Some(spec) => spec,
            None => {
                // spec missing means admission was bypassed; unbind and bail
                self.lock().busy_cameras.remove(&item.camera_id);
                return Err(EngineError::invalid_state(format!(
                    "no resolved spec for post {}",
                    item.post_id
                )));
            }
        };

        match self.transition_to_capturing(&item) {
            Ok(()) => Ok(Some(CaptureJob {
                post_id: item.post_id,
                spec,
            })),
            Err(e) => {
                let mut state = self.lock();
                state.busy_cameras.remove(&item.camera_id);
                state.specs.remove(&item.post_id);
                Err(e)
            }
        }
    }

    fn transition_to_capturing(&self, item: &CaptureQueueItem) -> EngineResult<()> {
        let mut post = self.load_post(&item.post_id)?;
        if !post.status.can_transition(PostStatus::Capturing) {
            return Err(EngineError::invalid_state(format!(
                "post {} is {} and cannot start capture",
                post.id, post.status
            )));
        }
        post.begin_capture();
        self.store.update_post(post)?;
        info!(post_id = %item.post_id, camera_id = %item.camera_id, "Capture started");
        Ok(())
    }

    /// Run the capture stage for a dispatched job. Returns `true` when the
    /// post moved to `processing` and the processing stage should run.
    pub async fn run_capture(&self, job: CaptureJob) -> EngineResult<bool> {
        let policy = RetryPolicy::new(
            self.config.capture_max_retries,
            self.config.capture_retry_base_delay,
            self.config.capture_retry_max_delay,
        );
        let capture_timeout = self.config.capture_timeout;

        let outcome = retry_with_backoff(&policy, "capture", || async {
            match tokio::time::timeout(capture_timeout, self.capture.start_capture(&job.spec)).await
            {
                Ok(result) => result,
                Err(_) => Err(WorkerError::new("capture timed out")),
            }
        })
        .await;

        // Re-acquire the critical section: release the camera and check for
        // cancellation intent before applying the transition.
        let cancelled = {
            let mut state = self.lock();
            state.busy_cameras.remove(&job.spec.camera_id);
            let cancelled = state.cancel_requested.remove(&job.post_id);
            if cancelled {
                state.specs.remove(&job.post_id);
            }
            cancelled
        };
        self.wake.notify_one();

        if cancelled {
            self.discard_cancelled(&job.post_id)?;
            return Ok(false);
        }

        match outcome {
            RetryOutcome::Success(output) => {
                let mut post = self.load_post(&job.post_id)?;
                post.complete_capture(output.source_clip_path);
                self.store.update_post(post)?;
                info!(post_id = %job.post_id, "Capture completed");
                Ok(true)
            }
            RetryOutcome::Exhausted { error, attempts } => {
                counter!("scheduler_capture_exhausted").increment(1);
                self.lock().specs.remove(&job.post_id);
                let err = EngineError::ExhaustedRetries {
                    attempts,
                    message: error.message,
                };
                warn!(post_id = %job.post_id, "{err}");
                self.fail_post(&job.post_id, err.to_string())?;
                Ok(false)
            }
        }
    }

    /// Run the processing stage for a post that completed capture. Bounded
    /// by the processing worker pool; not auto-retried on failure.
    pub async fn run_processing(&self, post_id: &PostId) -> EngineResult<()> {
        let _permit = self
            .processing_slots
            .acquire()
            .await
            .map_err(|_| EngineError::invalid_state("scheduler shut down"))?;

        // Cancellation may have been requested while waiting for a slot.
        let (cancelled, spec) = {
            let mut state = self.lock();
            let cancelled = state.cancel_requested.remove(post_id);
            let spec = state.specs.get(post_id).cloned();
            (cancelled, spec)
        };
        if cancelled {
            self.lock().specs.remove(post_id);
            self.discard_cancelled(post_id)?;
            return Ok(());
        }
        let spec = spec.ok_or_else(|| {
            EngineError::invalid_state(format!("no resolved spec for post {post_id}"))
        })?;

        let mut post = self.load_post(post_id)?;
        if post.status != PostStatus::Processing {
            return Err(EngineError::invalid_state(format!(
                "post {post_id} is {} and cannot be processed",
                post.status
            )));
        }
        let source_clip_path = post.source_clip_path.clone().ok_or_else(|| {
            EngineError::invalid_state(format!("post {post_id} has no source clip"))
        })?;
        post.begin_processing();
        self.store.update_post(post)?;
        debug!(post_id = %post_id, "Processing started");

        let result = match tokio::time::timeout(
            self.config.processing_timeout,
            self.processor.process_clip(&source_clip_path, &spec),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(WorkerError::new("processing timed out")),
        };

        let cancelled = {
            let mut state = self.lock();
            state.specs.remove(post_id);
            state.cancel_requested.remove(post_id)
        };
        if cancelled {
            self.discard_cancelled(post_id)?;
            return Ok(());
        }

        match result {
            Ok(output) => {
                let mut post = self.load_post(post_id)?;
                post.complete_processing(
                    output.portrait_clip_path,
                    output.output_path,
                    output.thumbnail_path,
                    output.headlines,
                );
                self.store.update_post(post)?;
                counter!("scheduler_posts_ready").increment(1);
                info!(post_id = %post_id, "Post ready");
            }
            Err(e) => {
                // source_clip_path stays on the post for diagnostics
                counter!("scheduler_processing_failed").increment(1);
                let err = EngineError::worker_failure(e.message);
                warn!(post_id = %post_id, "Processing failed: {err}");
                self.fail_post(post_id, err.to_string())?;
            }
        }
        Ok(())
    }

    /// Production loop: dispatch admissible work until shutdown. Woken by
    /// admissions and camera releases, with a periodic tick so expiry
    /// eviction happens even on an idle queue.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            processing_concurrency = self.config.processing_concurrency,
            "Pipeline scheduler started"
        );
        let mut tick = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping scheduler");
                        break;
                    }
                }
                _ = self.wake.notified() => Self::drain_dispatch(&self),
                _ = tick.tick() => Self::drain_dispatch(&self),
            }
        }
    }

    /// Dispatch every currently admissible item, spawning a pipeline task
    /// per capture job.
    fn drain_dispatch(this: &Arc<Self>) {
        loop {
            match this.dispatch_next() {
                Ok(Some(job)) => {
                    let scheduler = Arc::clone(this);
                    tokio::spawn(async move {
                        scheduler.execute(job).await;
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Dispatch failed: {e}");
                    break;
                }
            }
        }
    }

    /// Drive one dispatched job through capture and, on success, processing.
    async fn execute(&self, job: CaptureJob) {
        let post_id = job.post_id.clone();
        match self.run_capture(job).await {
            Ok(true) => {
                if let Err(e) = self.run_processing(&post_id).await {
                    error!(post_id = %post_id, "Processing stage error: {e}");
                }
            }
            Ok(false) => {}
            Err(e) => error!(post_id = %post_id, "Capture stage error: {e}"),
        }
    }

    fn load_post(&self, post_id: &PostId) -> EngineResult<ReelPost> {
        self.store
            .post(post_id)?
            .ok_or_else(|| EngineError::not_found(format!("post {post_id}")))
    }

    fn fail_post(&self, post_id: &PostId, error: impl Into<String>) -> EngineResult<()> {
        counter!("scheduler_posts_failed").increment(1);
        let mut post = self.load_post(post_id)?;
        post.fail(error);
        self.store.update_post(post)?;
        Ok(())
    }

    /// Reconcile an advisory cancellation: the worker result is discarded
    /// and the post deleted.
    fn discard_cancelled(&self, post_id: &PostId) -> EngineResult<()> {
        info!(post_id = %post_id, "Discarding result for cancelled post");
        self.store.delete_post(post_id)?;
        Ok(())
    }
}
