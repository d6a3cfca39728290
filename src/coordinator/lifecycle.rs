use super::orchestrator::ScanCoordinator;
use super::RECOVERABLE;
use super::types::ScanState;
use crate::camera::AcquisitionStatus;
use crate::capability::Availability;
use crate::presenter::RecoveryAction;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

impl ScanCoordinator {
    /// Begin scanning: check capability, open the camera, start sampling.
    ///
    /// Only acts from `Idle` or `Error`; every failure lands in `Error` with
    /// at least one recovery action.
    pub async fn start(&mut self) {
        if !matches!(self.state, ScanState::Idle | ScanState::Error) {
            debug!("Start ignored while {}", self.state);
            return;
        }

        self.pending_navigation = None;
        self.last_error = None;
        self.set_state(ScanState::AwaitingCamera);
        self.presenter.loading("Starting camera...");

        if let Availability::Unavailable(reason) = self.guard.check_availability() {
            warn!("Camera capture unavailable: {}", reason);
            // Retrying cannot fix a missing capability
            self.fail(reason.display_message(), &[RecoveryAction::ManualEntry]);
            return;
        }

        info!("Requesting camera {}", self.settings.request.device_name());
        let camera = std::sync::Arc::clone(&self.camera);
        let opened = tokio::select! {
            result = camera.open(&self.settings.request) => result,
            _ = self.cancellation_token.cancelled() => {
                info!("Camera request abandoned during shutdown");
                self.set_state(ScanState::Idle);
                return;
            }
        };

        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                error!("Camera acquisition failed: {}", e);
                self.acquisition = AcquisitionStatus::from_error(&e);
                self.fail(e.display_message(), RECOVERABLE);
                return;
            }
        };

        let dimensions = session.dimensions();
        self.acquisition = session.status();
        self.stats.sessions_opened += 1;
        self.raster.resize(dimensions.0, dimensions.1);
        self.session = Some(session);
        self.set_state(ScanState::Scanning);

        let ticks = self.tick_sender.clone();
        self.sampler
            .start_sampling(self.settings.sample_interval, move |tick| {
                match ticks.try_send(tick) {
                    Ok(()) => {}
                    Err(TrySendError::Full(tick)) => {
                        trace!("Coordinator busy, dropping tick {}", tick.sequence)
                    }
                    Err(TrySendError::Closed(_)) => {}
                }
            });

        self.presenter.scanning_active(dimensions);
        info!("Scanning at {}x{}", dimensions.0, dimensions.1);
    }

    /// Stop scanning and release the camera. Safe from any state.
    pub fn stop(&mut self) {
        let was_capturing = matches!(self.state, ScanState::Scanning | ScanState::AwaitingCamera);
        self.halt_capture();

        if was_capturing {
            self.set_state(ScanState::Idle);
            self.presenter.stopped();
            info!("Scanning stopped ({})", self.stats);
        }
    }

    /// Start again after a failure
    pub async fn retry(&mut self) {
        if self.state != ScanState::Error {
            debug!("Retry ignored while {}", self.state);
            return;
        }
        info!("Retrying scan");
        self.start().await;
    }

    /// Tear everything down: sampler, session and any pending navigation
    pub fn shutdown(&mut self, reason: &str) {
        info!("Scan coordinator shutting down: {}", reason);
        self.cancellation_token.cancel();
        self.halt_capture();
        if self.pending_navigation.take().is_some() {
            debug!("Pending navigation cancelled");
        }
        if matches!(
            self.state,
            ScanState::AwaitingCamera | ScanState::Scanning | ScanState::Resolving
        ) {
            self.set_state(ScanState::Idle);
        }
    }

    /// Stop the sampler, close the session and discard queued ticks.
    ///
    /// The sampler stops first so no tick can observe a closed session.
    pub(super) fn halt_capture(&mut self) {
        self.sampler.stop_sampling();

        if let Some(mut session) = self.session.take() {
            session.close();
            self.stats.sessions_closed += 1;
        }

        while self.tick_receiver.try_recv().is_ok() {
            self.stats.ticks_ignored += 1;
        }
    }

    pub(super) fn fail(&mut self, message: String, actions: &[RecoveryAction]) {
        self.halt_capture();
        self.set_state(ScanState::Error);
        self.presenter.error(&message, actions);
        self.last_error = Some(message);
    }
}

impl Drop for ScanCoordinator {
    fn drop(&mut self) {
        self.sampler.stop_sampling();
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}
