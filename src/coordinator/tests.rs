use super::*;
use crate::camera::{AcquisitionStatus, CaptureRequest, DisplaySurface, MockCameraSource};
use crate::capability::StaticCapabilityGuard;
use crate::config::{FacingMode, SnapshotConfig};
use crate::decoder::{CodeDecoder, DecodedPayload, Point, Quad};
use crate::error::{AcquisitionError, CapabilityError, ResolutionError};
use crate::presenter::{RecoveryAction, StatusPresenter, SuccessDisplay};
use crate::resolver::{
    CatalogResolver, EntityType, Resolution, ResolvedEntity, ResultResolver, ScanSubmission,
    ScanType,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Decoder that misses except on the listed call numbers (1-based)
struct ScriptedDecoder {
    hits: HashMap<u64, String>,
    calls: AtomicU64,
    dimensions: Mutex<Vec<(u32, u32, usize)>>,
}

impl ScriptedDecoder {
    fn new(hits: &[(u64, &str)]) -> Arc<Self> {
        Arc::new(Self {
            hits: hits.iter().map(|(n, s)| (*n, s.to_string())).collect(),
            calls: AtomicU64::new(0),
            dimensions: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CodeDecoder for ScriptedDecoder {
    fn decode(&self, raster: &[u8], width: u32, height: u32) -> Option<DecodedPayload> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.dimensions.lock().push((width, height, raster.len()));
        self.hits.get(&call).map(|text| {
            DecodedPayload::new(text.clone()).with_bounds(Quad {
                corners: [
                    Point { x: 10, y: 10 },
                    Point { x: 60, y: 10 },
                    Point { x: 60, y: 60 },
                    Point { x: 10, y: 60 },
                ],
            })
        })
    }
}

/// Resolver that records submissions and how many camera sessions were live
struct RecordingResolver {
    response: std::result::Result<Resolution, ResolutionError>,
    submissions: Mutex<Vec<ScanSubmission>>,
    camera: Option<Arc<MockCameraSource>>,
    live_sessions_at_call: Mutex<Vec<usize>>,
}

impl RecordingResolver {
    fn new(response: std::result::Result<Resolution, ResolutionError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            submissions: Mutex::new(Vec::new()),
            camera: None,
            live_sessions_at_call: Mutex::new(Vec::new()),
        })
    }

    fn watching(
        response: std::result::Result<Resolution, ResolutionError>,
        camera: Arc<MockCameraSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            response,
            submissions: Mutex::new(Vec::new()),
            camera: Some(camera),
            live_sessions_at_call: Mutex::new(Vec::new()),
        })
    }

    fn submissions(&self) -> Vec<ScanSubmission> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl ResultResolver for RecordingResolver {
    async fn resolve(
        &self,
        submission: &ScanSubmission,
    ) -> std::result::Result<Resolution, ResolutionError> {
        self.submissions.lock().push(submission.clone());
        if let Some(camera) = &self.camera {
            self.live_sessions_at_call.lock().push(camera.live_sessions());
        }
        self.response.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Loading,
    ScanningActive(u32, u32),
    Processing(String),
    Error(String, Vec<RecoveryAction>),
    Success(SuccessDisplay, String),
    Navigate(String),
    Stopped,
}

#[derive(Default)]
struct RecordingPresenter {
    shown: Mutex<Vec<Shown>>,
}

impl RecordingPresenter {
    fn shown(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }

    fn last(&self) -> Option<Shown> {
        self.shown.lock().last().cloned()
    }
}

impl StatusPresenter for RecordingPresenter {
    fn loading(&self, _message: &str) {
        self.shown.lock().push(Shown::Loading);
    }

    fn scanning_active(&self, dimensions: (u32, u32)) {
        self.shown
            .lock()
            .push(Shown::ScanningActive(dimensions.0, dimensions.1));
    }

    fn processing(&self, code: &str) {
        self.shown.lock().push(Shown::Processing(code.to_string()));
    }

    fn error(&self, message: &str, actions: &[RecoveryAction]) {
        self.shown
            .lock()
            .push(Shown::Error(message.to_string(), actions.to_vec()));
    }

    fn success(&self, display: &SuccessDisplay, navigate_to: &str) {
        self.shown
            .lock()
            .push(Shown::Success(display.clone(), navigate_to.to_string()));
    }

    fn navigate(&self, target: &str) {
        self.shown.lock().push(Shown::Navigate(target.to_string()));
    }

    fn stopped(&self) {
        self.shown.lock().push(Shown::Stopped);
    }
}

fn test_settings() -> CoordinatorSettings {
    CoordinatorSettings {
        request: CaptureRequest {
            device_index: 0,
            facing: FacingMode::Environment,
            ideal_resolution: (1280, 720),
            fps: 10,
            open_timeout: Duration::from_secs(1),
            surface: DisplaySurface::default(),
        },
        sample_interval: Duration::from_millis(200),
        navigation_delay: Duration::from_millis(1500),
        snapshot: SnapshotConfig {
            save_hits: false,
            path: "./scans".to_string(),
        },
    }
}

fn cabinet_build() -> Resolution {
    Resolution::Recognized(ResolvedEntity {
        entity_type: EntityType::Job,
        display_name: "Cabinet Build".to_string(),
        display_id: "J-42".to_string(),
        navigate_to: "/jobs/42/".to_string(),
    })
}

fn unknown_code() -> Resolution {
    Resolution::Unrecognized {
        error_message: "Unknown code".to_string(),
    }
}

struct Harness {
    coordinator: ScanCoordinator,
    camera: Arc<MockCameraSource>,
    decoder: Arc<ScriptedDecoder>,
    resolver: Arc<RecordingResolver>,
    presenter: Arc<RecordingPresenter>,
}

fn harness(
    decoder: Arc<ScriptedDecoder>,
    resolver: Arc<RecordingResolver>,
    camera: Arc<MockCameraSource>,
) -> Harness {
    let presenter = Arc::new(RecordingPresenter::default());
    let coordinator = ScanCoordinator::builder()
        .guard(Arc::new(StaticCapabilityGuard::available()))
        .camera(camera.clone())
        .decoder(decoder.clone())
        .resolver(resolver.clone())
        .presenter(presenter.clone())
        .settings(test_settings())
        .build()
        .unwrap();

    Harness {
        coordinator,
        camera,
        decoder,
        resolver,
        presenter,
    }
}

#[tokio::test(start_paused = true)]
async fn test_misses_keep_scanning() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    assert_eq!(h.coordinator.state(), ScanState::Scanning);
    assert!(h.coordinator.is_sampling());

    for _ in 0..4 {
        h.coordinator.process_next_tick().await;
        assert_eq!(h.coordinator.state(), ScanState::Scanning);
    }

    assert_eq!(h.decoder.calls(), 4);
    assert_eq!(h.coordinator.stats().decode_misses, 4);
    assert!(h.resolver.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_hit_wins() {
    let mut h = harness(
        ScriptedDecoder::new(&[(3, "JOB-3"), (4, "JOB-4")]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    for _ in 0..3 {
        h.coordinator.process_next_tick().await;
    }

    // Sampling stopped with the hit; no fourth tick ever arrives
    let fourth = tokio::time::timeout(Duration::from_secs(2), h.coordinator.process_next_tick()).await;
    assert!(fourth.is_err());

    assert_eq!(h.decoder.calls(), 3);
    assert_eq!(h.resolver.submissions(), vec![ScanSubmission::decoded("JOB-3")]);
    assert!(!h.coordinator.is_sampling());
    assert!(!h.coordinator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_stop_releases_camera_and_halts_decoding() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    h.coordinator.process_next_tick().await;
    h.coordinator.process_next_tick().await;
    assert!(h.coordinator.is_active());
    assert_eq!(h.camera.live_sessions(), 1);

    h.coordinator.stop();
    assert_eq!(h.coordinator.state(), ScanState::Idle);
    assert!(!h.coordinator.is_active());
    assert!(!h.coordinator.is_sampling());
    assert_eq!(h.camera.live_sessions(), 0);
    assert_eq!(h.presenter.last(), Some(Shown::Stopped));

    let calls = h.decoder.calls();
    let next = tokio::time::timeout(Duration::from_secs(2), h.coordinator.process_next_tick()).await;
    assert!(next.is_err());
    assert_eq!(h.decoder.calls(), calls);

    // Stopping again is harmless
    h.coordinator.stop();
    assert_eq!(h.coordinator.stats().sessions_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_capability_never_opens_camera() {
    let camera = Arc::new(MockCameraSource::new());
    let presenter = Arc::new(RecordingPresenter::default());
    let mut coordinator = ScanCoordinator::builder()
        .guard(Arc::new(StaticCapabilityGuard::unavailable(
            CapabilityError::Unsupported,
        )))
        .camera(camera.clone())
        .decoder(ScriptedDecoder::new(&[]))
        .resolver(RecordingResolver::new(Ok(cabinet_build())))
        .presenter(presenter.clone())
        .settings(test_settings())
        .build()
        .unwrap();

    coordinator.start().await;

    assert_eq!(camera.open_calls(), 0);
    assert_eq!(coordinator.state(), ScanState::Error);
    assert_eq!(coordinator.acquisition_status(), AcquisitionStatus::Unrequested);
    match presenter.last() {
        Some(Shown::Error(_, actions)) => assert_eq!(actions, vec![RecoveryAction::ManualEntry]),
        other => panic!("Expected error, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_device_offers_retry() {
    let camera = Arc::new(MockCameraSource::new());
    camera.fail_next(AcquisitionError::NoDevice {
        device: "/dev/video0".to_string(),
    });

    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        camera,
    );

    h.coordinator.start().await;
    assert_eq!(h.coordinator.state(), ScanState::Error);
    assert_eq!(h.coordinator.acquisition_status(), AcquisitionStatus::Failed);
    match h.presenter.last() {
        Some(Shown::Error(_, actions)) => assert_eq!(
            actions,
            vec![RecoveryAction::RetryScan, RecoveryAction::ManualEntry]
        ),
        other => panic!("Expected error, got {:?}", other),
    }

    // Camera plugged in
    h.coordinator.retry().await;
    assert_eq!(h.coordinator.state(), ScanState::Scanning);
    assert_eq!(h.camera.live_sessions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_start_leaves_no_stream_running() {
    for _ in 0..20 {
        let camera = Arc::new(MockCameraSource::new());
        {
            let mut h = harness(
                ScriptedDecoder::new(&[]),
                RecordingResolver::new(Ok(cabinet_build())),
                camera.clone(),
            );
            h.coordinator.cancellation_token().cancel();
            h.coordinator.start().await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(camera.live_sessions(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_failure_offers_retry() {
    let camera = Arc::new(MockCameraSource::new());
    camera.fail_next(AcquisitionError::PermissionDenied {
        device: "/dev/video0".to_string(),
    });

    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        camera,
    );

    h.coordinator.start().await;
    assert_eq!(h.coordinator.state(), ScanState::Error);
    assert_eq!(h.coordinator.acquisition_status(), AcquisitionStatus::Denied);
    assert!(!h.coordinator.is_sampling());
    match h.presenter.last() {
        Some(Shown::Error(message, actions)) => {
            assert!(message.contains("camera permission"));
            assert!(actions.contains(&RecoveryAction::RetryScan));
        }
        other => panic!("Expected error, got {:?}", other),
    }

    h.coordinator.retry().await;
    assert_eq!(h.coordinator.state(), ScanState::Scanning);
    assert_eq!(h.coordinator.acquisition_status(), AcquisitionStatus::Granted);
    assert_eq!(h.camera.open_calls(), 2);
    assert!(h.coordinator.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_from_idle_reaches_resolver() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(unknown_code())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator
        .submit_manual(ManualEntry::new("MAT-00231", ScanType::Auto))
        .await;

    assert_eq!(
        h.resolver.submissions(),
        vec![ScanSubmission::manual("MAT-00231", ScanType::Auto)]
    );
    assert_eq!(h.camera.open_calls(), 0);
    assert_eq!(h.coordinator.state(), ScanState::Error);
    assert_eq!(h.coordinator.last_error(), Some("Unknown code"));
    assert_eq!(
        h.presenter.shown(),
        vec![
            Shown::Processing("MAT-00231".to_string()),
            Shown::Error(
                "Unknown code".to_string(),
                vec![RecoveryAction::RetryScan, RecoveryAction::ManualEntry]
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_manual_entry_is_rejected_locally() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator
        .submit_manual(ManualEntry::new("   ", ScanType::Job))
        .await;

    assert!(h.resolver.submissions().is_empty());
    assert_eq!(h.coordinator.state(), ScanState::Error);
    assert_eq!(h.coordinator.last_error(), Some("No code provided"));
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_while_scanning_stops_capture() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    h.coordinator
        .submit_manual(ManualEntry::new(" J-42 ", ScanType::Job))
        .await;

    assert_eq!(h.camera.live_sessions(), 0);
    assert!(!h.coordinator.is_sampling());
    assert_eq!(
        h.resolver.submissions(),
        vec![ScanSubmission::manual("J-42", ScanType::Job)]
    );
    assert_eq!(h.coordinator.pending_navigation(), Some("/jobs/42/"));
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_is_display_safe() {
    let mut h = harness(
        ScriptedDecoder::new(&[(1, "J-1")]),
        RecordingResolver::new(Err(ResolutionError::Transport {
            details: "connection refused".to_string(),
        })),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    h.coordinator.process_next_tick().await;

    assert_eq!(h.coordinator.state(), ScanState::Error);
    assert_eq!(
        h.coordinator.last_error(),
        Some("An error occurred while processing the scan.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scan_navigates_after_delay() {
    let camera = Arc::new(MockCameraSource::new());
    let decoder = ScriptedDecoder::new(&[(6, "JOB-2024-0042")]);
    let resolver = RecordingResolver::watching(Ok(cabinet_build()), camera.clone());
    let mut h = harness(decoder, resolver, camera);

    h.coordinator.start().await;
    assert_eq!(h.coordinator.frame_dimensions(), Some((1280, 720)));

    for _ in 0..6 {
        h.coordinator.process_next_tick().await;
    }

    assert_eq!(h.decoder.calls(), 6);
    assert_eq!(h.coordinator.stats().decode_misses, 5);
    assert!(h
        .decoder
        .dimensions
        .lock()
        .iter()
        .all(|d| *d == (1280, 720, 1280 * 720)));

    // Camera released before the resolver saw the payload
    assert_eq!(*h.resolver.live_sessions_at_call.lock(), vec![0]);
    assert_eq!(
        h.resolver.submissions(),
        vec![ScanSubmission::decoded("JOB-2024-0042")]
    );
    assert!(!h.coordinator.is_sampling());
    assert_eq!(h.coordinator.state(), ScanState::Idle);

    match h.presenter.last() {
        Some(Shown::Success(display, target)) => {
            assert_eq!(display.title, "Job Detected");
            assert_eq!(display.display_name, "Cabinet Build");
            assert_eq!(target, "/jobs/42/");
        }
        other => panic!("Expected success, got {:?}", other),
    }

    let before = tokio::time::Instant::now();
    let target = h.coordinator.wait_for_navigation().await;
    assert_eq!(target.as_deref(), Some("/jobs/42/"));
    let waited = before.elapsed();
    assert!(waited >= Duration::from_millis(1500));
    assert!(waited < Duration::from_millis(1600));
    assert_eq!(h.presenter.last(), Some(Shown::Navigate("/jobs/42/".to_string())));
    assert!(h.coordinator.wait_for_navigation().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_drives_scan_to_navigation() {
    let camera = Arc::new(MockCameraSource::new());
    let mut h = harness(
        ScriptedDecoder::new(&[(2, "J-42")]),
        RecordingResolver::new(Ok(cabinet_build())),
        camera,
    );

    let (tx, rx) = mpsc::channel(8);
    tx.send(ScanCommand::Start).await.unwrap();

    let outcome = h.coordinator.run(rx).await;
    assert_eq!(outcome, ScanOutcome::Navigated("/jobs/42/".to_string()));
    assert_eq!(h.camera.live_sessions(), 0);
    assert_eq!(h.coordinator.stats().submissions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_reports_failure_on_shutdown() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(unknown_code())),
        Arc::new(MockCameraSource::new()),
    );

    let (tx, rx) = mpsc::channel(8);
    tx.send(ScanCommand::Manual(ManualEntry::new("XYZ", ScanType::Auto)))
        .await
        .unwrap();
    tx.send(ScanCommand::Shutdown).await.unwrap();

    let outcome = h.coordinator.run(rx).await;
    assert_eq!(outcome, ScanOutcome::Failed("Unknown code".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_tears_down_session() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );
    let token = h.coordinator.cancellation_token();

    let (tx, rx) = mpsc::channel(8);
    tx.send(ScanCommand::Start).await.unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        token.cancel();
    });

    let outcome = h.coordinator.run(rx).await;
    assert_eq!(outcome, ScanOutcome::Closed);
    assert_eq!(h.camera.live_sessions(), 0);
    assert!(h.coordinator.stats().decode_attempts >= 2);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_camera() {
    let camera = Arc::new(MockCameraSource::new());
    {
        let mut h = harness(
            ScriptedDecoder::new(&[]),
            RecordingResolver::new(Ok(cabinet_build())),
            camera.clone(),
        );
        h.coordinator.start().await;
        assert_eq!(camera.live_sessions(), 1);
    }
    assert_eq!(camera.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_outside_scanning_are_ignored() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator
        .handle_tick(crate::sampler::SampleTick {
            sequence: 1,
            timestamp: chrono::Utc::now(),
        })
        .await;

    assert_eq!(h.decoder.calls(), 0);
    assert_eq!(h.coordinator.stats().ticks_ignored, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hit_snapshot_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings();
    settings.request.ideal_resolution = (96, 96);
    settings.snapshot = SnapshotConfig {
        save_hits: true,
        path: dir.path().display().to_string(),
    };

    let mut coordinator = ScanCoordinator::builder()
        .guard(Arc::new(StaticCapabilityGuard::available()))
        .camera(Arc::new(MockCameraSource::new()))
        .decoder(ScriptedDecoder::new(&[(1, "M-17")]))
        .resolver(Arc::new(CatalogResolver::demo()))
        .presenter(Arc::new(RecordingPresenter::default()))
        .settings(settings)
        .build()
        .unwrap();

    coordinator.start().await;
    coordinator.process_next_tick().await;

    assert_eq!(coordinator.pending_navigation(), Some("/scan/material/M-17/"));
    let saved: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(saved.len(), 1);
}

#[test]
fn test_builder_requires_collaborators() {
    let result = ScanCoordinator::builder()
        .guard(Arc::new(StaticCapabilityGuard::available()))
        .build();
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_scanning_active_reports_dimensions() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::with_resolution(640, 480)),
    );

    h.coordinator.start().await;
    assert_eq!(
        h.presenter.shown(),
        vec![Shown::Loading, Shown::ScanningActive(640, 480)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_cancels_pending_navigation() {
    let mut h = harness(
        ScriptedDecoder::new(&[(1, "J-42")]),
        RecordingResolver::new(Ok(cabinet_build())),
        Arc::new(MockCameraSource::new()),
    );

    h.coordinator.start().await;
    h.coordinator.process_next_tick().await;
    assert_eq!(h.coordinator.pending_navigation(), Some("/jobs/42/"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    h.coordinator.start().await;

    assert_eq!(h.coordinator.state(), ScanState::Scanning);
    assert!(h.coordinator.pending_navigation().is_none());
    assert!(h.coordinator.wait_for_navigation().await.is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!h
        .presenter
        .shown()
        .iter()
        .any(|shown| matches!(shown, Shown::Navigate(_))));
}

#[tokio::test(start_paused = true)]
async fn test_manual_entry_replaces_pending_navigation() {
    let mut h = harness(
        ScriptedDecoder::new(&[]),
        RecordingResolver::new(Ok(unknown_code())),
        Arc::new(MockCameraSource::new()),
    );
    h.coordinator.pending_navigation = Some(super::types::PendingNavigation {
        target: "/jobs/42/".to_string(),
        deadline: tokio::time::Instant::now() + Duration::from_millis(1500),
    });

    h.coordinator
        .submit_manual(ManualEntry::new("XYZ", ScanType::Auto))
        .await;

    assert!(h.coordinator.pending_navigation().is_none());
    assert!(h.coordinator.wait_for_navigation().await.is_none());
    assert_eq!(h.coordinator.state(), ScanState::Error);
}
