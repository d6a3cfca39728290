use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Camera acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ScannerError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// The runtime cannot capture video at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("camera capture is not supported on this platform")]
    Unsupported,

    #[error("camera support was not compiled into this build")]
    FeatureDisabled,
}

impl CapabilityError {
    pub fn display_message(&self) -> String {
        match self {
            CapabilityError::Unsupported | CapabilityError::FeatureDisabled => {
                "Camera scanning is not available on this device. Enter the code manually."
                    .to_string()
            }
        }
    }
}

/// Opening a capture stream failed; retrying may succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("permission to use camera {device} was denied")]
    PermissionDenied { device: String },

    #[error("camera {device} is not present")]
    NoDevice { device: String },

    #[error("camera {device} is busy")]
    DeviceBusy { device: String },

    #[error("camera did not deliver a frame within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("camera backend error: {details}")]
    Backend { details: String },
}

impl AcquisitionError {
    pub fn display_message(&self) -> String {
        match self {
            AcquisitionError::PermissionDenied { .. } => {
                "Camera access failed. Please ensure camera permission has been granted."
                    .to_string()
            }
            AcquisitionError::NoDevice { .. } => "No camera is connected.".to_string(),
            AcquisitionError::DeviceBusy { .. } => {
                "The camera is in use by another application.".to_string()
            }
            AcquisitionError::Timeout { .. } => "The camera did not start in time.".to_string(),
            AcquisitionError::Backend { .. } => "Camera access failed.".to_string(),
        }
    }
}

/// The resolver could not classify a submitted code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("request failed: {details}")]
    Transport { details: String },

    #[error("server returned {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("malformed response: {details}")]
    Malformed { details: String },

    #[error("{message}")]
    Rejected { message: String },
}

impl ResolutionError {
    pub fn display_message(&self) -> String {
        match self {
            ResolutionError::Rejected { message } => message.clone(),
            _ => "An error occurred while processing the scan.".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event receiver lagged behind by {missed} events")]
    Lagged { missed: u64 },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ScannerError>;
