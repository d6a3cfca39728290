mod builder;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod interface;
mod mock;
mod session;

pub use builder::{CameraSourceBuilder, SourceKind};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use interface::GstCameraSource;
pub use mock::{MockCameraSource, StillImageSource};
pub use session::{
    wait_for_first_frame, AcquisitionStatus, CaptureRequest, CaptureSession, DisplaySurface,
    StreamHandle,
};

use crate::error::AcquisitionError;
use async_trait::async_trait;

/// Acquires capture streams. Implementations resolve only once the stream's
/// real dimensions are known.
#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn open(&self, request: &CaptureRequest) -> Result<CaptureSession, AcquisitionError>;
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
pub(crate) struct UnsupportedCameraSource;

#[cfg(not(all(feature = "camera", target_os = "linux")))]
#[async_trait]
impl CameraSource for UnsupportedCameraSource {
    async fn open(&self, request: &CaptureRequest) -> Result<CaptureSession, AcquisitionError> {
        Err(AcquisitionError::NoDevice {
            device: request.device_name(),
        })
    }
}
