use super::orchestrator::ScanCoordinator;
use super::RECOVERABLE;
use super::types::{ManualEntry, PendingNavigation, ScanState};
use crate::decoder::{highlight_payload, save_snapshot, DecodedPayload};
use crate::frame::FrameData;
use crate::presenter::SuccessDisplay;
use crate::resolver::{Resolution, ScanSubmission};
use crate::sampler::SampleTick;
use std::path::Path;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

impl ScanCoordinator {
    /// Wait for the next sampler tick and act on it
    pub async fn process_next_tick(&mut self) {
        if let Some(tick) = self.tick_receiver.recv().await {
            self.handle_tick(tick).await;
        }
    }

    /// Inspect the current frame. Only acts while `Scanning`.
    ///
    /// On the first hit the sampler and session are torn down before the
    /// payload goes to the resolver, so later ticks can never decode again.
    pub async fn handle_tick(&mut self, tick: SampleTick) {
        self.stats.ticks_observed += 1;

        if self.state != ScanState::Scanning {
            self.stats.ticks_ignored += 1;
            debug!("Tick {} ignored while {}", tick.sequence, self.state);
            return;
        }

        let Some(session) = self.session.as_ref() else {
            self.stats.ticks_ignored += 1;
            return;
        };

        let Some(frame) = self.raster.capture(session) else {
            self.stats.ticks_ignored += 1;
            trace!("Tick {} had no frame to inspect", tick.sequence);
            return;
        };

        self.stats.decode_attempts += 1;
        let decoded = self.decoder.decode(
            self.raster.pixels(),
            self.raster.width(),
            self.raster.height(),
        );

        let Some(payload) = decoded else {
            self.stats.decode_misses += 1;
            trace!("Tick {}: no code in frame {}", tick.sequence, frame.id);
            return;
        };

        info!(
            "Code detected on tick {} (frame {}): {}",
            tick.sequence, frame.id, payload.text
        );

        self.halt_capture();
        self.set_state(ScanState::Resolving);

        if self.settings.snapshot.save_hits {
            self.save_hit(&frame, &payload);
        }

        self.resolve(ScanSubmission::decoded(payload.text)).await;
    }

    /// Submit a typed identifier. Capture stops first if it is running.
    pub async fn submit_manual(&mut self, entry: ManualEntry) {
        if self.state == ScanState::Resolving {
            warn!("Manual entry ignored while a code is being resolved");
            return;
        }

        self.halt_capture();
        self.pending_navigation = None;

        let code = entry.code.trim();
        if code.is_empty() {
            self.fail("No code provided".to_string(), RECOVERABLE);
            return;
        }

        info!("Manual entry '{}' ({})", code, entry.entry_type);
        self.last_error = None;
        self.set_state(ScanState::Resolving);
        self.resolve(ScanSubmission::manual(code, entry.entry_type))
            .await;
    }

    async fn resolve(&mut self, submission: ScanSubmission) {
        self.stats.submissions += 1;
        self.presenter.processing(&submission.code);

        let resolver = std::sync::Arc::clone(&self.resolver);
        let result = tokio::select! {
            result = resolver.resolve(&submission) => result,
            _ = self.cancellation_token.cancelled() => {
                info!("Resolution of '{}' abandoned during shutdown", submission.code);
                self.set_state(ScanState::Idle);
                return;
            }
        };

        match result {
            Ok(Resolution::Recognized(entity)) => {
                info!(
                    "'{}' resolved to {} {} ({})",
                    submission.code,
                    entity.entity_type,
                    entity.display_id,
                    entity.display_name
                );
                self.set_state(ScanState::Idle);
                self.presenter
                    .success(&SuccessDisplay::from(&entity), &entity.navigate_to);
                self.pending_navigation = Some(PendingNavigation {
                    target: entity.navigate_to,
                    deadline: Instant::now() + self.settings.navigation_delay,
                });
            }
            Ok(Resolution::Unrecognized { error_message }) => {
                info!("'{}' not recognised: {}", submission.code, error_message);
                self.fail(error_message, RECOVERABLE);
            }
            Err(e) => {
                error!("Resolver failed for '{}': {}", submission.code, e);
                self.fail(e.display_message(), RECOVERABLE);
            }
        }
    }

    /// Wait out the post-success delay, then navigate.
    ///
    /// Returns the target, or `None` when nothing is pending.
    pub async fn wait_for_navigation(&mut self) -> Option<String> {
        let deadline = self.pending_navigation.as_ref()?.deadline;
        tokio::time::sleep_until(deadline).await;
        self.fire_navigation()
    }

    pub(super) fn navigation_deadline(&self) -> Option<Instant> {
        self.pending_navigation.as_ref().map(|p| p.deadline)
    }

    pub(super) fn fire_navigation(&mut self) -> Option<String> {
        let pending = self.pending_navigation.take()?;
        info!("Navigating to {}", pending.target);
        self.presenter.navigate(&pending.target);
        Some(pending.target)
    }

    fn save_hit(&self, frame: &FrameData, payload: &DecodedPayload) {
        let Some(bounds) = payload.bounds.as_ref() else {
            debug!("Decoded payload has no bounds; snapshot skipped");
            return;
        };

        let saved = highlight_payload(frame, bounds)
            .and_then(|image| save_snapshot(Path::new(&self.settings.snapshot.path), &image));
        if let Err(e) = saved {
            warn!("Failed to save scan snapshot: {}", e);
        }
    }
}
