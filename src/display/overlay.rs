//! Bounding-box overlay drawn over the preview surface.
use std::path::Path;

use image::RgbaImage;

use crate::errors::{QrLensError, QrLensResult};
use crate::perception::annotator::{annotate, encode_png, StrokeStyle};
use crate::perception::types::Rect;

#[derive(Debug, Clone, Default)]
pub struct OverlayView {
    bounds: Option<Rect>,
    generation: u64,
    style: StrokeStyle,
}

impl OverlayView {
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            bounds: None,
            generation: 0,
            style,
        }
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    /// Replace the drawn rectangle and request a redraw. Returns true when
    /// the bounds actually changed.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) -> bool {
        if self.bounds == bounds {
            return false;
        }
        self.bounds = bounds;
        self.invalidate();
        true
    }

    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn render(&self, preview: &RgbaImage) -> RgbaImage {
        annotate(preview, self.bounds, self.style)
    }

    /// Render onto `preview` and write `overlay_<sequence>.png` into `dir`.
    pub fn write_png(&self, preview: &RgbaImage, dir: &Path, sequence: u64) -> QrLensResult<()> {
        std::fs::create_dir_all(dir)?;
        let bytes = encode_png(&self.render(preview))?;
        let path = dir.join(format!("overlay_{sequence}.png"));
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "overlay written");
        Ok(())
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` into RGBA.
pub fn parse_colour(hex: &str) -> QrLensResult<[u8; 4]> {
    let digits = hex.trim().trim_start_matches('#');
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return Err(QrLensError::Config(format!("invalid colour '{hex}'")));
    }
    let byte = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| QrLensError::Config(format!("invalid colour '{hex}'")))
    };
    let alpha = if digits.len() == 8 { byte(6)? } else { 0xFF };
    Ok([byte(0)?, byte(2)?, byte(4)?, alpha])
}
