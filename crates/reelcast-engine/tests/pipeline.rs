//! End-to-end pipeline tests with channel-controlled mock workers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use reelcast_engine::{
    CaptureOutput, CaptureRequest, CaptureWorker, ClipProcessor, EngineConfig, ExportUpdate,
    ProcessingOutput, ReelService, ResolvedJobSpec, WorkerError, WorkerResult,
};
use reelcast_models::{ExportStatus, Headline, PostStatus};
use reelcast_store::MemoryStore;

/// Capture worker gated on an external signal, so tests control exactly
/// when a capture finishes.
struct GatedCapture {
    release: Mutex<tokio::sync::mpsc::Receiver<WorkerResult<()>>>,
}

impl GatedCapture {
    fn new() -> (Self, tokio::sync::mpsc::Sender<WorkerResult<()>>) {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        (
            Self {
                release: Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl CaptureWorker for GatedCapture {
    async fn start_capture(&self, spec: &ResolvedJobSpec) -> WorkerResult<CaptureOutput> {
        let mut rx = self.release.lock().await;
        match rx.recv().await {
            Some(Ok(())) => Ok(CaptureOutput {
                source_clip_path: format!("/clips/{}-raw.mp4", spec.camera_id),
            }),
            Some(Err(e)) => Err(e),
            None => Err(WorkerError::new("capture gate closed")),
        }
    }
}

struct InstantProcessor;

#[async_trait]
impl ClipProcessor for InstantProcessor {
    async fn process_clip(
        &self,
        source_clip_path: &str,
        _spec: &ResolvedJobSpec,
    ) -> WorkerResult<ProcessingOutput> {
        Ok(ProcessingOutput {
            portrait_clip_path: source_clip_path.replace("raw", "portrait"),
            output_path: source_clip_path.replace("raw", "out"),
            thumbnail_path: source_clip_path.replace("raw.mp4", "thumb.jpg"),
            headlines: vec![Headline {
                text: "Live Now".into(),
                start_time: 0.0,
                duration: 2.0,
            }],
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        capture_max_retries: 0,
        capture_retry_base_delay: Duration::from_millis(1),
        capture_retry_max_delay: Duration::from_millis(1),
        ..Default::default()
    }
}

async fn wait_for_status(svc: &ReelService, post_id: &reelcast_models::PostId, want: PostStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = svc.post(post_id).unwrap().status;
        if status == want {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "post stuck in {status}, wanted {want}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn queue_capture_to_posted_export() {
    init_tracing();
    let (capture, capture_gate) = GatedCapture::new();
    let svc = ReelService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(capture),
        Arc::new(InstantProcessor),
        fast_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_loop = tokio::spawn(svc.scheduler().run(shutdown_rx));

    // queue a capture for camera 7
    let post = svc.queue_capture(CaptureRequest::for_camera("cam-7")).unwrap();
    wait_for_status(&svc, &post.id, PostStatus::Capturing).await;

    // simulate capture success
    capture_gate.send(Ok(())).await.unwrap();
    wait_for_status(&svc, &post.id, PostStatus::Ready).await;

    let post = svc.post(&post.id).unwrap();
    assert_eq!(post.source_clip_path.as_deref(), Some("/clips/cam-7-raw.mp4"));
    assert_eq!(post.output_path.as_deref(), Some("/clips/cam-7-out.mp4"));
    assert_eq!(
        post.generated_headlines,
        vec![Headline {
            text: "Live Now".into(),
            start_time: 0.0,
            duration: 2.0,
        }]
    );
    assert!(post.capture_started_at.is_some());
    assert!(post.capture_completed_at.is_some());
    assert!(post.processing_started_at.is_some());
    assert!(post.processing_completed_at.is_some());

    // ad-hoc export (no target), then posting confirmation
    let export = svc.record_export(&post.id, None).unwrap();
    assert_eq!(export.status, ExportStatus::Exported);

    let posted = svc
        .update_export(
            &export.id,
            ExportUpdate {
                status: ExportStatus::Posted,
                platform_url: Some("https://youtube.com/shorts/xyz".into()),
            },
        )
        .unwrap();
    assert_eq!(posted.status, ExportStatus::Posted);
    assert!(posted.posted_at.is_some());

    shutdown_tx.send(true).unwrap();
    scheduler_loop.await.unwrap();
}

#[tokio::test]
async fn same_camera_captures_are_serialized() {
    init_tracing();
    let (capture, capture_gate) = GatedCapture::new();
    let svc = ReelService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(capture),
        Arc::new(InstantProcessor),
        fast_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_loop = tokio::spawn(svc.scheduler().run(shutdown_rx));

    let first = svc.queue_capture(CaptureRequest::for_camera("cam-1")).unwrap();
    let second = svc.queue_capture(CaptureRequest::for_camera("cam-1")).unwrap();

    wait_for_status(&svc, &first.id, PostStatus::Capturing).await;

    // while the first capture runs, the second never leaves queued
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(svc.post(&second.id).unwrap().status, PostStatus::Queued);

    // release the first capture; the camera frees up and the second follows
    capture_gate.send(Ok(())).await.unwrap();
    wait_for_status(&svc, &second.id, PostStatus::Capturing).await;
    capture_gate.send(Ok(())).await.unwrap();
    wait_for_status(&svc, &second.id, PostStatus::Ready).await;

    shutdown_tx.send(true).unwrap();
    scheduler_loop.await.unwrap();
}

#[tokio::test]
async fn capture_failure_surfaces_error_message() {
    init_tracing();
    let (capture, capture_gate) = GatedCapture::new();
    let svc = ReelService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(capture),
        Arc::new(InstantProcessor),
        fast_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_loop = tokio::spawn(svc.scheduler().run(shutdown_rx));

    let post = svc.queue_capture(CaptureRequest::for_camera("cam-1")).unwrap();
    wait_for_status(&svc, &post.id, PostStatus::Capturing).await;

    capture_gate
        .send(Err(WorkerError::new("rtsp stream unavailable")))
        .await
        .unwrap();
    wait_for_status(&svc, &post.id, PostStatus::Failed).await;

    let post = svc.post(&post.id).unwrap();
    let message = post.error_message.unwrap();
    assert!(message.contains("rtsp stream unavailable"), "got: {message}");

    // a failed post cannot be exported
    assert!(svc.record_export(&post.id, None).is_err());

    shutdown_tx.send(true).unwrap();
    scheduler_loop.await.unwrap();
}
