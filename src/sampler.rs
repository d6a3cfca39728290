use crate::camera::CaptureSession;
use crate::frame::FrameData;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// One fixed-interval frame inspection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTick {
    /// Position of this tick within its sampling run, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-rate clock. It knows nothing about frames or scan state; the
/// coordinator decides what a tick means.
pub struct FrameSampler {
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self {
            task: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Invoke `on_tick` every `interval` until stopped. Restarts the clock if
    /// already sampling.
    pub fn start_sampling<F>(&mut self, interval: Duration, on_tick: F)
    where
        F: Fn(SampleTick) + Send + 'static,
    {
        self.stop_sampling();

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();

        info!("Frame sampling started every {}ms", interval.as_millis());

        self.task = Some(tokio::spawn(async move {
            let mut clock = tokio::time::interval(interval);
            clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; samples
            // start one interval after the stream opens.
            clock.tick().await;

            let mut sequence = 0u64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = clock.tick() => {
                        sequence += 1;
                        trace!("Sample tick {}", sequence);
                        on_tick(SampleTick {
                            sequence,
                            timestamp: Utc::now(),
                        });
                    }
                }
            }

            debug!("Frame sampling loop exited after {} ticks", sequence);
        }));
    }

    /// Stop the clock. Safe to call when not sampling.
    pub fn stop_sampling(&mut self) {
        if let Some(task) = self.task.take() {
            self.cancel.cancel();
            task.abort();
            info!("Frame sampling stopped");
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.task.is_some()
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop_sampling();
    }
}

/// Offscreen luma buffer sized to the capture session's frames
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Match the buffer to the given frame dimensions
    pub fn resize(&mut self, width: u32, height: u32) {
        if (self.width, self.height) != (width, height) {
            debug!("Raster buffer resized to {}x{}", width, height);
            self.width = width;
            self.height = height;
        }
        self.pixels.resize(width as usize * height as usize, 0);
    }

    /// Copy the session's latest frame into the buffer and return that frame.
    ///
    /// Returns `None` when there is nothing usable to copy.
    pub fn capture(&mut self, session: &CaptureSession) -> Option<FrameData> {
        let frame = session.latest_frame()?;

        if (frame.width, frame.height) != (self.width, self.height) {
            self.resize(frame.width, frame.height);
        }

        match frame.write_luma(&mut self.pixels) {
            Ok(()) => Some(frame),
            Err(e) => {
                debug!("Skipping unusable frame {}: {}", frame.id, e);
                self.pixels.resize(self.width as usize * self.height as usize, 0);
                None
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Default for RasterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraSource, CaptureRequest, MockCameraSource};
    use crate::config::CameraConfig;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_sampler_ticks_at_fixed_rate() {
        let count = Arc::new(AtomicU64::new(0));
        let mut sampler = FrameSampler::new();

        let ticks = Arc::clone(&count);
        sampler.start_sampling(Duration::from_millis(200), move |_| {
            ticks.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sampler.is_sampling());

        tokio::time::sleep(Duration::from_millis(1010)).await;
        assert_eq!(count.load(Ordering::SeqCst), 5);

        sampler.stop_sampling();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert!(!sampler.is_sampling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_sequence_restarts_per_run() {
        let last = Arc::new(AtomicU64::new(0));
        let mut sampler = FrameSampler::new();

        let seen = Arc::clone(&last);
        sampler.start_sampling(Duration::from_millis(100), move |tick| {
            seen.store(tick.sequence, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(last.load(Ordering::SeqCst), 3);

        let seen = Arc::clone(&last);
        sampler.start_sampling(Duration::from_millis(100), move |tick| {
            seen.store(tick.sequence, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(last.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_when_not_sampling() {
        let mut sampler = FrameSampler::new();
        sampler.stop_sampling();
        sampler.stop_sampling();
        assert!(!sampler.is_sampling());
    }

    #[tokio::test]
    async fn test_raster_matches_session_dimensions() {
        let camera = MockCameraSource::with_resolution(64, 48);
        let mut session = camera
            .open(&CaptureRequest::from_config(&CameraConfig {
                index: 0,
                facing: crate::config::FacingMode::Environment,
                ideal_resolution: (1280, 720),
                fps: 30,
                open_timeout_ms: 1000,
            }))
            .await
            .unwrap();

        let mut raster = RasterBuffer::new();
        let (width, height) = session.dimensions();
        raster.resize(width, height);

        assert!(raster.capture(&session).is_some());
        assert_eq!((raster.width(), raster.height()), (64, 48));
        assert_eq!(raster.pixels().len(), 64 * 48);

        session.close();
        assert!(raster.capture(&session).is_none());
    }
}
