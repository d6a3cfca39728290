use super::mock::{MockCameraSource, StillImageSource};
use super::CameraSource;
use crate::capability::{CapabilityGuard, DeviceCapabilityGuard, StaticCapabilityGuard};
use crate::error::{Result, ScannerError};
use std::path::PathBuf;
use std::sync::Arc;

/// Which frame source backs the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// V4L2 device through GStreamer
    Camera { index: u32 },
    /// Synthetic frames
    Mock,
    /// A still image served as a live stream
    Image(PathBuf),
}

/// Builds a camera source together with the capability guard that fronts it
pub struct CameraSourceBuilder {
    kind: Option<SourceKind>,
}

impl CameraSourceBuilder {
    pub fn new() -> Self {
        Self { kind: None }
    }

    pub fn kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn build(self) -> Result<(Arc<dyn CapabilityGuard>, Arc<dyn CameraSource>)> {
        let kind = self
            .kind
            .ok_or_else(|| ScannerError::system("Camera source kind must be specified"))?;

        match kind {
            SourceKind::Camera { index } => {
                tracing::debug!("Scanning with camera /dev/video{}", index);
                let guard: Arc<dyn CapabilityGuard> = Arc::new(DeviceCapabilityGuard::new());
                Ok((guard, device_source()?))
            }
            SourceKind::Mock => Ok((
                Arc::new(StaticCapabilityGuard::available()),
                Arc::new(MockCameraSource::new()),
            )),
            SourceKind::Image(path) => Ok((
                Arc::new(StaticCapabilityGuard::available()),
                Arc::new(StillImageSource::new(path)),
            )),
        }
    }
}

impl Default for CameraSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn device_source() -> Result<Arc<dyn CameraSource>> {
    Ok(Arc::new(super::interface::GstCameraSource::new()?))
}

/// Without a capture backend the guard reports the camera unavailable, so
/// this source is never opened.
#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn device_source() -> Result<Arc<dyn CameraSource>> {
    Ok(Arc::new(super::UnsupportedCameraSource))
}
