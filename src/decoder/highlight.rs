use super::Quad;
use crate::error::Result;
use crate::frame::FrameData;
use chrono::Utc;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outline colour for a located code (#FF3B58)
pub const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([0xFF, 0x3B, 0x58]);

/// Outline thickness in pixels
pub const HIGHLIGHT_WIDTH: i32 = 4;

/// Draw the code outline onto an RGB copy of the frame
pub fn highlight_payload(frame: &FrameData, bounds: &Quad) -> Result<RgbImage> {
    let mut canvas = frame.to_rgb_image()?;

    let half = HIGHLIGHT_WIDTH / 2;
    for i in 0..4 {
        let start = bounds.corners[i];
        let end = bounds.corners[(i + 1) % 4];

        // imageproc draws one-pixel lines; offset copies give the stroke width
        for offset in -half..HIGHLIGHT_WIDTH - half {
            for (dx, dy) in [(offset, 0), (0, offset)] {
                draw_line_segment_mut(
                    &mut canvas,
                    ((start.x + dx) as f32, (start.y + dy) as f32),
                    ((end.x + dx) as f32, (end.y + dy) as f32),
                    HIGHLIGHT_COLOR,
                );
            }
        }
    }

    Ok(canvas)
}

/// Write an annotated hit frame as PNG under `dir`
pub fn save_snapshot(dir: &Path, image: &RgbImage) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("scan_{}.png", Utc::now().format("%Y%m%d_%H%M%S_%3f")));
    image.save(&path)?;

    info!("Saved scan snapshot to {}", path.display());
    Ok(path)
}
