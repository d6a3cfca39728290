use super::session::{wait_for_first_frame, CaptureRequest, CaptureSession, StreamHandle};
use super::CameraSource;
use crate::error::AcquisitionError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// GStreamer V4L2 camera source delivering GRAY8 frames
pub struct GstCameraSource {
    _private: (),
}

impl GstCameraSource {
    /// Initialise GStreamer
    pub fn new() -> Result<Self, AcquisitionError> {
        gstreamer::init().map_err(|e| AcquisitionError::Backend {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self { _private: () })
    }

    /// Build the pipeline description; `resolution` is a preference, not a requirement
    fn build_pipeline_string(request: &CaptureRequest, resolution: Option<(u32, u32)>) -> String {
        let source_caps = match resolution {
            Some((width, height)) => format!(
                "video/x-raw,width={},height={},framerate={}/1 ! ",
                width, height, request.fps
            ),
            None => String::new(),
        };

        format!(
            "v4l2src device={} io-mode=mmap ! {}\
             videoconvert ! video/x-raw,format=GRAY8 ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            request.device_name(),
            source_caps
        )
    }

    fn launch(
        request: &CaptureRequest,
        resolution: Option<(u32, u32)>,
        frames: watch::Sender<Option<FrameData>>,
    ) -> Result<Pipeline, AcquisitionError> {
        let description = Self::build_pipeline_string(request, resolution);
        info!("Creating GStreamer pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| AcquisitionError::Backend {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| AcquisitionError::Backend {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| AcquisitionError::Backend {
                details: "Failed to get appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| AcquisitionError::Backend {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    match Self::sample_to_frame(&sample, &frame_counter) {
                        Ok(frame) => {
                            frames.send_replace(Some(frame));
                        }
                        Err(details) => warn!("Dropping camera sample: {}", details),
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let mapped = Self::error_from_bus(&pipeline, request)
                .unwrap_or_else(|| AcquisitionError::Backend {
                    details: format!("Failed to start pipeline: {}", e),
                });
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(mapped);
        }

        Ok(pipeline)
    }

    /// Copy a GRAY8 sample into a tightly packed frame
    fn sample_to_frame(
        sample: &gstreamer::Sample,
        frame_counter: &AtomicU64,
    ) -> Result<FrameData, String> {
        let buffer = sample.buffer().ok_or("No buffer in sample")?;
        let caps = sample.caps().ok_or("No caps in sample")?;
        let video_info =
            VideoInfo::from_caps(caps).map_err(|e| format!("Failed to get video info: {}", e))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;

        let map = buffer
            .map_readable()
            .map_err(|e| format!("Failed to map buffer: {}", e))?;
        let bytes = map.as_slice();

        let row = width as usize;
        if width == 0 || height == 0 {
            return Err("sample has zero dimensions".to_string());
        }
        if bytes.len() < stride * (height as usize - 1) + row {
            return Err(format!(
                "buffer of {} bytes too small for {}x{} stride {}",
                bytes.len(),
                width,
                height,
                stride
            ));
        }

        let data = if stride == row {
            bytes[..row * height as usize].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row * height as usize);
            for y in 0..height as usize {
                packed.extend_from_slice(&bytes[y * stride..y * stride + row]);
            }
            packed
        };

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!("Captured GRAY8 frame {} ({}x{})", frame_id, width, height);

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            width,
            height,
            FrameFormat::Gray8,
        ))
    }

    /// Translate the first error message on the pipeline bus
    fn error_from_bus(pipeline: &Pipeline, request: &CaptureRequest) -> Option<AcquisitionError> {
        let bus = pipeline.bus()?;
        let message = bus.timed_pop_filtered(
            gstreamer::ClockTime::from_mseconds(200),
            &[gstreamer::MessageType::Error],
        )?;

        let gstreamer::MessageView::Error(err) = message.view() else {
            return None;
        };

        let device = request.device_name();
        let text = err.error().to_string();
        error!("Camera pipeline error: {} ({:?})", text, err.debug());

        let mapped = match err.error().kind::<gstreamer::ResourceError>() {
            Some(gstreamer::ResourceError::NotAuthorized) => {
                AcquisitionError::PermissionDenied { device }
            }
            Some(gstreamer::ResourceError::Busy) => AcquisitionError::DeviceBusy { device },
            Some(gstreamer::ResourceError::NotFound) => AcquisitionError::NoDevice { device },
            Some(gstreamer::ResourceError::OpenRead)
            | Some(gstreamer::ResourceError::OpenReadWrite)
                if text.to_lowercase().contains("permission") =>
            {
                AcquisitionError::PermissionDenied { device }
            }
            Some(gstreamer::ResourceError::OpenRead)
            | Some(gstreamer::ResourceError::OpenReadWrite)
                if text.to_lowercase().contains("busy") =>
            {
                AcquisitionError::DeviceBusy { device }
            }
            _ => AcquisitionError::Backend { details: text },
        };

        Some(mapped)
    }
}

#[async_trait]
impl CameraSource for GstCameraSource {
    async fn open(&self, request: &CaptureRequest) -> Result<CaptureSession, AcquisitionError> {
        debug!(
            "Opening {} (facing hint '{}' is not exposed by V4L2)",
            request.device_name(),
            request.facing.as_str()
        );

        let device = request.device_name();
        if !std::path::Path::new(&device).exists() {
            warn!("Capture device {} not present", device);
            return Err(AcquisitionError::NoDevice { device });
        }

        let attempts = [Some(request.ideal_resolution), None];
        let mut last_error = None;

        for resolution in attempts {
            let (tx, mut rx) = watch::channel(None);

            let pipeline = match Self::launch(request, resolution, tx) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    warn!("Camera pipeline with {:?} failed: {}", resolution, e);
                    let retryable = matches!(e, AcquisitionError::Backend { .. });
                    last_error = Some(e);
                    if retryable {
                        continue;
                    }
                    break;
                }
            };

            let mut stream = GstStream {
                pipeline: Some(pipeline),
            };
            match wait_for_first_frame(&mut rx, request.open_timeout).await {
                Ok(dimensions) => {
                    if Some(dimensions) != resolution && resolution.is_some() {
                        warn!(
                            "Camera resolution adjusted by driver: requested {}x{}, got {}x{}",
                            request.ideal_resolution.0,
                            request.ideal_resolution.1,
                            dimensions.0,
                            dimensions.1
                        );
                    }
                    return Ok(CaptureSession::new(
                        request.surface.clone(),
                        dimensions,
                        rx,
                        Box::new(stream),
                    ));
                }
                Err(e) => {
                    let mapped = stream
                        .pipeline
                        .as_ref()
                        .and_then(|p| Self::error_from_bus(p, request))
                        .unwrap_or(e);
                    stream.release();
                    warn!("Camera stream with {:?} failed: {}", resolution, mapped);
                    let retryable = matches!(mapped, AcquisitionError::Backend { .. });
                    last_error = Some(mapped);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AcquisitionError::NoDevice {
            device: request.device_name(),
        }))
    }
}

/// Running pipeline; taken on release so the device is stopped exactly once
struct GstStream {
    pipeline: Option<Pipeline>,
}

impl StreamHandle for GstStream {
    fn release(&mut self) {
        let Some(pipeline) = self.pipeline.take() else {
            return;
        };
        if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
            error!("Failed to stop camera pipeline: {}", e);
        } else {
            debug!("Camera pipeline stopped");
        }
    }
}

// An abandoned open drops the stream before any session owns it
impl Drop for GstStream {
    fn drop(&mut self) {
        self.release();
    }
}
