//! Paint detection overlays onto preview images.
//!
//! The preview is built from the upright frame exactly the way the mapper
//! assumes it is shown (uniform fill, centered crop), so a rectangle mapped
//! by the same `CoordinateMapper` lands on the code in the rendered image.
use image::RgbaImage;

use crate::errors::{QrLensError, QrLensResult};
use crate::perception::mapper::CoordinateMapper;
use crate::perception::types::Rect;

/// Stroke style for the bounding-box overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeStyle {
    pub colour: [u8; 4],
    pub width: u32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            colour: [0x62, 0x00, 0xEE, 0xFF],
            width: 10,
        }
    }
}

/// Scale the upright frame by the mapper's scale and crop it by the
/// mapper's offsets into a preview-sized image.
pub fn render_preview(upright: &RgbaImage, mapper: &CoordinateMapper) -> QrLensResult<RgbaImage> {
    let preview = mapper.preview();
    let pw = preview.width.round() as u32;
    let ph = preview.height.round() as u32;
    if pw == 0 || ph == 0 || upright.width() == 0 || upright.height() == 0 {
        return Err(QrLensError::Capture("empty preview or frame".into()));
    }

    let scale = mapper.scale();
    let sw = ((upright.width() as f64 * scale).round() as u32).max(1);
    let sh = ((upright.height() as f64 * scale).round() as u32).max(1);
    let scaled = image::imageops::resize(upright, sw, sh, image::imageops::FilterType::Triangle);

    let (dx, dy) = mapper.offset();
    let mut canvas = RgbaImage::from_pixel(pw, ph, image::Rgba([0, 0, 0, 255]));
    image::imageops::overlay(&mut canvas, &scaled, dx.round() as i64, dy.round() as i64);
    Ok(canvas)
}

/// Draw `bounds` onto a copy of `preview`. The stroke grows inward from the
/// rectangle's edges; anything outside the canvas is clipped.
pub fn annotate(preview: &RgbaImage, bounds: Option<Rect>, style: StrokeStyle) -> RgbaImage {
    let mut canvas = preview.clone();
    if let Some(rect) = bounds {
        draw_rect(&mut canvas, rect, style.colour, style.width.max(1) as i32);
    }
    canvas
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> QrLensResult<Vec<u8>> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(out)
}

// ── Drawing primitives ──────────────────────────────────────────────────────

fn draw_rect(canvas: &mut RgbaImage, rect: Rect, col: [u8; 4], thickness: i32) {
    let (w, h) = canvas.dimensions();
    let (iw, ih) = (w as i32, h as i32);

    // Visible span only; the rect may extend far off-canvas after mapping.
    let x_from = rect.left.max(0);
    let x_to = rect.right.min(iw - 1);
    let y_from = rect.top.max(0);
    let y_to = rect.bottom.min(ih - 1);

    for t in 0..thickness {
        let ty = rect.top.saturating_add(t);
        let by = rect.bottom.saturating_sub(t);
        for x in x_from..=x_to {
            if ty >= 0 && ty < ih {
                blend_pixel(canvas, x as u32, ty as u32, col);
            }
            if by != ty && by >= 0 && by < ih {
                blend_pixel(canvas, x as u32, by as u32, col);
            }
        }
    }
    for t in 0..thickness {
        let lx = rect.left.saturating_add(t);
        let rx = rect.right.saturating_sub(t);
        for y in y_from..=y_to {
            if lx >= 0 && lx < iw {
                blend_pixel(canvas, lx as u32, y as u32, col);
            }
            if rx != lx && rx >= 0 && rx < iw {
                blend_pixel(canvas, rx as u32, y as u32, col);
            }
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    p[0] = (p[0] as f32 * (1.0 - a) + col[0] as f32 * a).round() as u8;
    p[1] = (p[1] as f32 * (1.0 - a) + col[1] as f32 * a).round() as u8;
    p[2] = (p[2] as f32 * (1.0 - a) + col[2] as f32 * a).round() as u8;
    p[3] = 255;
}
