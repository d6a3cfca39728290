use crate::config::{CameraConfig, FacingMode};
use crate::error::AcquisitionError;
use crate::frame::FrameData;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of the most recent request for camera access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStatus {
    Unrequested,
    Granted,
    Denied,
    Failed,
}

impl AcquisitionStatus {
    pub fn from_error(error: &AcquisitionError) -> Self {
        match error {
            AcquisitionError::PermissionDenied { .. } => AcquisitionStatus::Denied,
            _ => AcquisitionStatus::Failed,
        }
    }
}

/// Where the live preview is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySurface {
    pub name: String,
}

impl DisplaySurface {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new("scanner-preview")
    }
}

/// Parameters for opening a capture stream. Facing and resolution are hints.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub device_index: u32,
    pub facing: FacingMode,
    pub ideal_resolution: (u32, u32),
    pub fps: u32,
    pub open_timeout: Duration,
    pub surface: DisplaySurface,
}

impl CaptureRequest {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            device_index: config.index,
            facing: config.facing,
            ideal_resolution: config.ideal_resolution,
            fps: config.fps,
            open_timeout: config.open_timeout(),
            surface: DisplaySurface::default(),
        }
    }

    pub fn device_name(&self) -> String {
        format!("/dev/video{}", self.device_index)
    }
}

/// Backend-specific handle that owns the underlying device tracks
pub trait StreamHandle: Send {
    /// Stop every track and release the device
    fn release(&mut self);
}

/// One open camera stream bound to a display surface.
///
/// The device is released by [`CaptureSession::close`] or on drop, whichever
/// comes first.
pub struct CaptureSession {
    id: Uuid,
    surface: DisplaySurface,
    status: AcquisitionStatus,
    dimensions: (u32, u32),
    frames: watch::Receiver<Option<FrameData>>,
    stream: Option<Box<dyn StreamHandle>>,
}

impl CaptureSession {
    pub fn new(
        surface: DisplaySurface,
        dimensions: (u32, u32),
        frames: watch::Receiver<Option<FrameData>>,
        stream: Box<dyn StreamHandle>,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(
            "Capture session {} opened on '{}' at {}x{}",
            id, surface.name, dimensions.0, dimensions.1
        );

        Self {
            id,
            surface,
            status: AcquisitionStatus::Granted,
            dimensions,
            frames,
            stream: Some(stream),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn status(&self) -> AcquisitionStatus {
        self.status
    }

    /// Actual frame dimensions negotiated with the device
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Most recent frame, or None once the session is closed
    pub fn latest_frame(&self) -> Option<FrameData> {
        if !self.is_active() {
            return None;
        }
        self.frames.borrow().clone()
    }

    /// Release every track. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!("Capture session {} closed", self.id);
        } else {
            debug!("Capture session {} already closed", self.id);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("surface", &self.surface)
            .field("dimensions", &self.dimensions)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Wait until the stream publishes its first frame and report its dimensions
pub async fn wait_for_first_frame(
    frames: &mut watch::Receiver<Option<FrameData>>,
    timeout: Duration,
) -> Result<(u32, u32), AcquisitionError> {
    let waited = tokio::time::timeout(timeout, async {
        loop {
            if let Some(frame) = frames.borrow_and_update().as_ref() {
                return Ok((frame.width, frame.height));
            }
            if frames.changed().await.is_err() {
                return Err(AcquisitionError::Backend {
                    details: "stream ended before delivering a frame".to_string(),
                });
            }
        }
    })
    .await;

    match waited {
        Ok(result) => result,
        Err(_) => Err(AcquisitionError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
