//! Optical code detection on sampled luma rasters

mod highlight;


pub use highlight::{highlight_payload, save_snapshot, HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

/// Pixel coordinate of a code corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Four corners of a located code, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point; 4],
}

impl Quad {
    /// Axis-aligned bounding box as (min_x, min_y, max_x, max_y)
    pub fn bounding_box(&self) -> (i32, i32, i32, i32) {
        let xs = self.corners.iter().map(|p| p.x);
        let ys = self.corners.iter().map(|p| p.y);
        (
            xs.clone().min().unwrap_or(0),
            ys.clone().min().unwrap_or(0),
            xs.max().unwrap_or(0),
            ys.max().unwrap_or(0),
        )
    }
}

/// The string recovered from a successfully read code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub text: String,
    pub bounds: Option<Quad>,
}

impl DecodedPayload {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Quad) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Locates and decodes at most one code in a luma raster.
///
/// `None` means nothing was found. A raster whose length does not match
/// `width * height` is logged and treated as a miss.
pub trait CodeDecoder: Send + Sync {
    fn decode(&self, raster: &[u8], width: u32, height: u32) -> Option<DecodedPayload>;
}

/// QR decoder backed by rqrr
#[derive(Debug, Default, Clone)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl CodeDecoder for QrDecoder {
    fn decode(&self, raster: &[u8], width: u32, height: u32) -> Option<DecodedPayload> {
        let expected = width as usize * height as usize;
        if raster.len() != expected || expected == 0 {
            error!(
                "Raster of {} bytes does not match {}x{}; skipping decode",
                raster.len(),
                width,
                height
            );
            return None;
        }

        let w = width as usize;
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w, height as usize, |x, y| raster[y * w + x]);

        let grids = prepared.detect_grids();
        trace!("Found {} candidate grids", grids.len());

        for grid in grids {
            match grid.decode() {
                Ok((meta, content)) => {
                    info!(
                        "QR code decoded: {} chars, version {:?}, ecc {}",
                        content.len(),
                        meta.version,
                        meta.ecc_level
                    );
                    let corners = grid.bounds.map(|p| Point { x: p.x, y: p.y });
                    return Some(DecodedPayload::new(content).with_bounds(Quad { corners }));
                }
                Err(e) => debug!("Grid decode failed: {:?}", e),
            }
        }

        None
    }
}
