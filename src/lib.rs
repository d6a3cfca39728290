pub mod camera;
pub mod capability;
pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod presenter;
pub mod resolver;
pub mod sampler;

pub use camera::{
    AcquisitionStatus, CameraSource, CameraSourceBuilder, CaptureRequest, CaptureSession,
    MockCameraSource, SourceKind, StillImageSource,
};
pub use capability::{Availability, CapabilityGuard, DeviceCapabilityGuard, StaticCapabilityGuard};
pub use config::ScannerConfig;
pub use coordinator::{
    spawn_signal_handlers, CoordinatorSettings, ManualEntry, ScanCommand, ScanCoordinator,
    ScanCoordinatorBuilder, ScanOutcome, ScanState, ScanStats,
};
pub use decoder::{CodeDecoder, DecodedPayload, Point, QrDecoder, Quad};
pub use error::{Result, ScannerError};
pub use events::{EventBus, EventFilter, EventReceiver, ScanEvent};
pub use frame::{FrameData, FrameFormat};
pub use keyboard_input::KeyboardInputHandler;
pub use presenter::{EventBusPresenter, RecoveryAction, StatusPresenter, SuccessDisplay};
pub use resolver::{
    CatalogResolver, EntityType, HttpResolver, Resolution, ResolvedEntity, ResultResolver,
    ScanSubmission, ScanType,
};
pub use sampler::{FrameSampler, RasterBuffer, SampleTick};
