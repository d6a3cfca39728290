use crate::error::{Result, ScannerError};
use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// 8-bit luma, one byte per pixel
    Gray8,
    /// Packed RGB, three bytes per pixel
    Rgb24,
    /// Packed RGBA, four bytes per pixel
    Rgba32,
    /// Motion JPEG, compressed
    Mjpeg,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Gray8 => 1,
            FrameFormat::Rgb24 => 3,
            FrameFormat::Rgba32 => 4,
            FrameFormat::Mjpeg => 0,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier within a capture session
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Build an RGB frame from a decoded image
    pub fn from_image(id: u64, image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(
            id,
            SystemTime::now(),
            rgb.into_raw(),
            width,
            height,
            FrameFormat::Rgb24,
        )
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// Write the frame's luma plane into `dst`, resizing it to width * height
    pub fn write_luma(&self, dst: &mut Vec<u8>) -> Result<()> {
        if !self.validate_size() {
            return Err(ScannerError::component(
                "frame".to_string(),
                format!(
                    "frame {} has {} bytes, expected {:?}",
                    self.id,
                    self.data.len(),
                    self.expected_size()
                ),
            ));
        }

        let pixels = self.width as usize * self.height as usize;
        dst.clear();
        dst.reserve(pixels);

        match self.format {
            FrameFormat::Gray8 => dst.extend_from_slice(&self.data),
            FrameFormat::Rgb24 => dst.extend(self.data.chunks_exact(3).map(luma)),
            FrameFormat::Rgba32 => dst.extend(self.data.chunks_exact(4).map(luma)),
            FrameFormat::Mjpeg => {
                let decoded = image::load_from_memory(&self.data)?.to_luma8();
                if decoded.dimensions() != (self.width, self.height) {
                    return Err(ScannerError::component(
                        "frame".to_string(),
                        format!(
                            "frame {} decoded to {}x{}, declared {}x{}",
                            self.id,
                            decoded.width(),
                            decoded.height(),
                            self.width,
                            self.height
                        ),
                    ));
                }
                dst.extend_from_slice(decoded.as_raw());
            }
        }

        Ok(())
    }

    /// Convert the frame to an RGB image (used for highlighting)
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let invalid = || {
            ScannerError::component(
                "frame".to_string(),
                format!("frame {} does not match its declared size", self.id),
            )
        };

        match self.format {
            FrameFormat::Rgb24 => {
                RgbImage::from_raw(self.width, self.height, self.data.to_vec()).ok_or_else(invalid)
            }
            FrameFormat::Gray8 => {
                let gray = GrayImage::from_raw(self.width, self.height, self.data.to_vec())
                    .ok_or_else(invalid)?;
                Ok(DynamicImage::ImageLuma8(gray).to_rgb8())
            }
            FrameFormat::Rgba32 => {
                let rgba = image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
                    .ok_or_else(invalid)?;
                Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
            }
            FrameFormat::Mjpeg => Ok(image::load_from_memory(&self.data)?.to_rgb8()),
        }
    }
}

/// ITU-R BT.601 luma of an RGB(A) pixel
fn luma(px: &[u8]) -> u8 {
    ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8
}
