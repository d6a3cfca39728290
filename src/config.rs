use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    pub camera: CameraConfig,
    pub sampler: SamplerConfig,
    pub resolver: ResolverConfig,
    pub presenter: PresenterConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Preferred camera facing; a hint only
    #[serde(default = "default_camera_facing")]
    pub facing: FacingMode,

    /// Ideal resolution (width, height); the device may substitute another
    #[serde(default = "default_ideal_resolution")]
    pub ideal_resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// How long to wait for the first frame before giving up
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SamplerConfig {
    /// Interval between frame samples in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
    /// Base URL of the workshop server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path that classifies scanned codes
    #[serde(default = "default_process_path")]
    pub process_path: String,

    /// Anti-forgery token sent as X-CSRFToken
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_resolver_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PresenterConfig {
    /// Delay between showing a result and navigating to it
    #[serde(default = "default_navigation_delay_ms")]
    pub navigation_delay_ms: u64,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SnapshotConfig {
    /// Save an annotated PNG of every decoded frame
    #[serde(default)]
    pub save_hits: bool,

    /// Directory for saved hit frames
    #[serde(default = "default_snapshot_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera on mobile devices
    Environment,
    /// Front camera
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl CameraConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Full URL of the code processing endpoint
    pub fn process_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.process_path.trim_start_matches('/')
        )
    }
}

impl PresenterConfig {
    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }
}

impl ScannerConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("scanner.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default("camera.facing", default_camera_facing().as_str())?
            .set_default(
                "camera.ideal_resolution",
                vec![default_ideal_resolution().0, default_ideal_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.open_timeout_ms", default_open_timeout_ms())?
            .set_default("sampler.interval_ms", default_sample_interval_ms())?
            .set_default("resolver.base_url", default_base_url())?
            .set_default("resolver.process_path", default_process_path())?
            .set_default("resolver.timeout_ms", default_resolver_timeout_ms())?
            .set_default(
                "presenter.navigation_delay_ms",
                default_navigation_delay_ms(),
            )?
            .set_default(
                "presenter.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("snapshot.save_hits", false)?
            .set_default("snapshot.path", default_snapshot_path())?
            .add_source(File::with_name(&path_str).required(false))
            // SCANNER__SAMPLER__INTERVAL_MS=250
            .add_source(Environment::with_prefix("SCANNER").separator("__"))
            .build()?;

        let config: ScannerConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.ideal_resolution.0 == 0 || self.camera.ideal_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera ideal_resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.open_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera open_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.sampler.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Sampler interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.resolver.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Resolver base_url must not be empty".to_string(),
            ));
        }

        if self.resolver.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Resolver timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.presenter.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                facing: default_camera_facing(),
                ideal_resolution: default_ideal_resolution(),
                fps: default_camera_fps(),
                open_timeout_ms: default_open_timeout_ms(),
            },
            sampler: SamplerConfig {
                interval_ms: default_sample_interval_ms(),
            },
            resolver: ResolverConfig {
                base_url: default_base_url(),
                process_path: default_process_path(),
                csrf_token: None,
                timeout_ms: default_resolver_timeout_ms(),
            },
            presenter: PresenterConfig {
                navigation_delay_ms: default_navigation_delay_ms(),
                event_bus_capacity: default_event_bus_capacity(),
            },
            snapshot: SnapshotConfig {
                save_hits: false,
                path: default_snapshot_path(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_facing() -> FacingMode {
    FacingMode::Environment
}
fn default_ideal_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_open_timeout_ms() -> u64 {
    5000
}

fn default_sample_interval_ms() -> u64 {
    200
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_process_path() -> String {
    "/scan/process/".to_string()
}
fn default_resolver_timeout_ms() -> u64 {
    10_000
}

fn default_navigation_delay_ms() -> u64 {
    1500
}
fn default_event_bus_capacity() -> usize {
    64
}

fn default_snapshot_path() -> String {
    "./scans".to_string()
}
