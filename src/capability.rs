use crate::error::CapabilityError;
use tracing::debug;

/// Result of probing the runtime for camera capture support
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(CapabilityError),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Answers whether camera capture can be attempted at all. Query only.
pub trait CapabilityGuard: Send + Sync {
    fn check_availability(&self) -> Availability;
}

/// Checks that this build can capture at all: a Linux target with the
/// GStreamer backend compiled in.
///
/// Whether a device is plugged in is left to `CameraSource::open`, so a
/// missing camera stays retryable.
#[derive(Debug, Default)]
pub struct DeviceCapabilityGuard;

impl DeviceCapabilityGuard {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityGuard for DeviceCapabilityGuard {
    fn check_availability(&self) -> Availability {
        if !cfg!(target_os = "linux") {
            debug!("Camera capture requires Linux");
            return Availability::Unavailable(CapabilityError::Unsupported);
        }

        if !cfg!(feature = "camera") {
            debug!("Built without the camera feature");
            return Availability::Unavailable(CapabilityError::FeatureDisabled);
        }

        Availability::Available
    }
}

/// Guard with a fixed answer, for synthetic sources and tests
pub struct StaticCapabilityGuard {
    availability: Availability,
}

impl StaticCapabilityGuard {
    pub fn available() -> Self {
        Self {
            availability: Availability::Available,
        }
    }

    pub fn unavailable(reason: CapabilityError) -> Self {
        Self {
            availability: Availability::Unavailable(reason),
        }
    }
}

impl CapabilityGuard for StaticCapabilityGuard {
    fn check_availability(&self) -> Availability {
        self.availability.clone()
    }
}
