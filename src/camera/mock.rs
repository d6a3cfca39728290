use super::session::{wait_for_first_frame, CaptureRequest, CaptureSession, StreamHandle};
use super::CameraSource;
use crate::error::AcquisitionError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use image::DynamicImage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

type FrameGenerator = Box<dyn FnMut(u64) -> FrameData + Send>;

/// Frame loop driven by a tokio interval, standing in for device tracks
struct SyntheticStream {
    task: JoinHandle<()>,
    live: Arc<AtomicUsize>,
    released: bool,
}

impl SyntheticStream {
    fn spawn(
        fps: u32,
        mut generator: FrameGenerator,
        frames: watch::Sender<Option<FrameData>>,
        live: Arc<AtomicUsize>,
    ) -> Self {
        live.fetch_add(1, Ordering::SeqCst);

        let frame_interval = Duration::from_micros(1_000_000 / fps.max(1) as u64);
        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(frame_interval);
            let mut frame_id = 0u64;

            loop {
                interval_timer.tick().await;
                let frame = generator(frame_id);
                trace!("Generated synthetic frame {}", frame_id);
                if frames.send(Some(frame)).is_err() {
                    break;
                }
                frame_id += 1;
            }
        });

        Self {
            task,
            live,
            released: false,
        }
    }
}

impl StreamHandle for SyntheticStream {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.task.abort();
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Synthetic stream released");
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Camera source producing synthetic grey frames, with scripted failures
pub struct MockCameraSource {
    resolution: Option<(u32, u32)>,
    failures: Mutex<VecDeque<AcquisitionError>>,
    open_calls: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl MockCameraSource {
    /// Mock that honours the requested resolution
    pub fn new() -> Self {
        Self {
            resolution: None,
            failures: Mutex::new(VecDeque::new()),
            open_calls: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mock that substitutes its own resolution, like a device ignoring the hint
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            resolution: Some((width, height)),
            ..Self::new()
        }
    }

    /// Make the next `open` fail with `error`
    pub fn fail_next(&self, error: AcquisitionError) {
        self.failures.lock().push_back(error);
    }

    /// Number of times `open` has been called
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Number of sessions whose tracks have not been released
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for MockCameraSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraSource for MockCameraSource {
    async fn open(&self, request: &CaptureRequest) -> Result<CaptureSession, AcquisitionError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failures.lock().pop_front() {
            info!("Mock camera failing open: {}", error);
            return Err(error);
        }

        let (width, height) = self.resolution.unwrap_or(request.ideal_resolution);
        let generator: FrameGenerator = Box::new(move |frame_id| {
            let shade = (frame_id % 200) as u8 + 28;
            FrameData::new(
                frame_id,
                SystemTime::now(),
                vec![shade; width as usize * height as usize],
                width,
                height,
                FrameFormat::Gray8,
            )
        });

        let (tx, mut rx) = watch::channel(None);
        let mut stream = SyntheticStream::spawn(request.fps, generator, tx, Arc::clone(&self.live));

        match wait_for_first_frame(&mut rx, request.open_timeout).await {
            Ok(dimensions) => Ok(CaptureSession::new(
                request.surface.clone(),
                dimensions,
                rx,
                Box::new(stream),
            )),
            Err(e) => {
                stream.release();
                Err(e)
            }
        }
    }
}

/// Serves a still image file as if it were a live camera
pub struct StillImageSource {
    path: PathBuf,
}

impl StillImageSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<DynamicImage, AcquisitionError> {
        image::open(&self.path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AcquisitionError::NoDevice {
                    device: self.path.display().to_string(),
                }
            }
            image::ImageError::IoError(io)
                if io.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                AcquisitionError::PermissionDenied {
                    device: self.path.display().to_string(),
                }
            }
            other => AcquisitionError::Backend {
                details: format!("failed to load {}: {}", self.path.display(), other),
            },
        })
    }
}

#[async_trait]
impl CameraSource for StillImageSource {
    async fn open(&self, request: &CaptureRequest) -> Result<CaptureSession, AcquisitionError> {
        let image = self.load()?;
        let template = FrameData::from_image(0, &image);
        info!(
            "Still image source {} loaded ({}x{})",
            self.path.display(),
            template.width,
            template.height
        );

        let generator: FrameGenerator = Box::new(move |frame_id| FrameData {
            id: frame_id,
            timestamp: SystemTime::now(),
            ..template.clone()
        });

        let (tx, mut rx) = watch::channel(None);
        let mut stream = SyntheticStream::spawn(
            request.fps,
            generator,
            tx,
            Arc::new(AtomicUsize::new(0)),
        );

        match wait_for_first_frame(&mut rx, request.open_timeout).await {
            Ok(dimensions) => Ok(CaptureSession::new(
                request.surface.clone(),
                dimensions,
                rx,
                Box::new(stream),
            )),
            Err(e) => {
                stream.release();
                Err(e)
            }
        }
    }
}
