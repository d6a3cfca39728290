use super::stats::ScanStats;
use super::types::{PendingNavigation, ScanState};
use crate::camera::{AcquisitionStatus, CameraSource, CaptureRequest, CaptureSession};
use crate::capability::CapabilityGuard;
use crate::config::{ScannerConfig, SnapshotConfig};
use crate::decoder::CodeDecoder;
use crate::error::{Result, ScannerError};
use crate::presenter::StatusPresenter;
use crate::resolver::ResultResolver;
use crate::sampler::{FrameSampler, RasterBuffer, SampleTick};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TICK_QUEUE_DEPTH: usize = 2;

/// Timing and capture parameters for one scanner view
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub request: CaptureRequest,
    pub sample_interval: Duration,
    pub navigation_delay: Duration,
    pub snapshot: SnapshotConfig,
}

impl CoordinatorSettings {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            request: CaptureRequest::from_config(&config.camera),
            sample_interval: config.sampler.interval(),
            navigation_delay: config.presenter.navigation_delay(),
            snapshot: config.snapshot.clone(),
        }
    }
}

/// Drives one scanner view: capability check, camera session, frame
/// sampling, decoding and the hand-off to the resolver.
///
/// All transitions go through `&mut self`, so one task owns the coordinator
/// and no locking is needed around [`ScanState`].
pub struct ScanCoordinator {
    pub(super) guard: Arc<dyn CapabilityGuard>,
    pub(super) camera: Arc<dyn CameraSource>,
    pub(super) decoder: Arc<dyn CodeDecoder>,
    pub(super) resolver: Arc<dyn ResultResolver>,
    pub(super) presenter: Arc<dyn StatusPresenter>,
    pub(super) settings: CoordinatorSettings,

    pub(super) state: ScanState,
    pub(super) session: Option<CaptureSession>,
    pub(super) acquisition: AcquisitionStatus,
    pub(super) sampler: FrameSampler,
    pub(super) raster: RasterBuffer,
    pub(super) tick_sender: mpsc::Sender<SampleTick>,
    pub(super) tick_receiver: mpsc::Receiver<SampleTick>,
    pub(super) pending_navigation: Option<PendingNavigation>,
    pub(super) last_error: Option<String>,
    pub(super) stats: ScanStats,
    pub(super) cancellation_token: CancellationToken,
}

impl ScanCoordinator {
    pub fn builder() -> ScanCoordinatorBuilder {
        ScanCoordinatorBuilder::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether a capture session is currently open
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_sampling()
    }

    pub fn acquisition_status(&self) -> AcquisitionStatus {
        self.acquisition
    }

    /// Dimensions of the open session's frames
    pub fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| s.dimensions())
    }

    /// Message of the most recent failure, cleared when a new attempt starts
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Navigation target waiting for its delay to elapse
    pub fn pending_navigation(&self) -> Option<&str> {
        self.pending_navigation.as_ref().map(|p| p.target.as_str())
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Token that tears the coordinator down when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub(super) fn set_state(&mut self, state: ScanState) {
        if self.state != state {
            tracing::debug!("Scan state {} -> {}", self.state, state);
            self.state = state;
        }
    }
}

/// Assembles a coordinator from its collaborators
#[derive(Default)]
pub struct ScanCoordinatorBuilder {
    guard: Option<Arc<dyn CapabilityGuard>>,
    camera: Option<Arc<dyn CameraSource>>,
    decoder: Option<Arc<dyn CodeDecoder>>,
    resolver: Option<Arc<dyn ResultResolver>>,
    presenter: Option<Arc<dyn StatusPresenter>>,
    settings: Option<CoordinatorSettings>,
    cancellation_token: Option<CancellationToken>,
}

impl ScanCoordinatorBuilder {
    pub fn guard(mut self, guard: Arc<dyn CapabilityGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn camera(mut self, camera: Arc<dyn CameraSource>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn CodeDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResultResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn StatusPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn config(self, config: &ScannerConfig) -> Self {
        self.settings(CoordinatorSettings::from_config(config))
    }

    /// Share a cancellation token with the rest of the application
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn build(self) -> Result<ScanCoordinator> {
        let missing = |what: &str| ScannerError::system(format!("Scan coordinator requires a {}", what));

        let (tick_sender, tick_receiver) = mpsc::channel(TICK_QUEUE_DEPTH);

        Ok(ScanCoordinator {
            guard: self.guard.ok_or_else(|| missing("capability guard"))?,
            camera: self.camera.ok_or_else(|| missing("camera source"))?,
            decoder: self.decoder.ok_or_else(|| missing("code decoder"))?,
            resolver: self.resolver.ok_or_else(|| missing("result resolver"))?,
            presenter: self.presenter.ok_or_else(|| missing("status presenter"))?,
            settings: self
                .settings
                .unwrap_or_else(|| CoordinatorSettings::from_config(&ScannerConfig::default())),
            state: ScanState::Idle,
            session: None,
            acquisition: AcquisitionStatus::Unrequested,
            sampler: FrameSampler::new(),
            raster: RasterBuffer::new(),
            tick_sender,
            tick_receiver,
            pending_navigation: None,
            last_error: None,
            stats: ScanStats::default(),
            cancellation_token: self.cancellation_token.unwrap_or_else(CancellationToken::new),
        })
    }
}
