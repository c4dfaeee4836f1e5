//! QR code decoding with `rqrr`.
//!
//! Grids are detected on a luma copy of the frame, optionally downsampled so
//! that large captures stay fast; corner points are scaled back to the
//! full-resolution frame before the bounding box is computed.
use image::RgbaImage;

use crate::errors::QrLensResult;
use crate::perception::traits::BarcodeDecoder;
use crate::perception::types::{Rect, ScanResult};

/// Overlap above which two detections of the same value are one code.
const DUPLICATE_IOU: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct RqrrDecoder {
    /// Longest side the luma image is downsampled to; 0 keeps full resolution.
    max_dimension: u32,
}

impl RqrrDecoder {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    fn downsample_factor(&self, width: u32, height: u32) -> f32 {
        if self.max_dimension > 0 && (width > self.max_dimension || height > self.max_dimension) {
            width.max(height) as f32 / self.max_dimension as f32
        } else {
            1.0
        }
    }
}

impl Default for RqrrDecoder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BarcodeDecoder for RqrrDecoder {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn decode(&self, image: &RgbaImage) -> QrLensResult<Vec<ScanResult>> {
        let (w, h) = image.dimensions();
        let factor = self.downsample_factor(w, h);

        let gray = if factor > 1.0 {
            let nw = ((w as f32 / factor) as u32).max(1);
            let nh = ((h as f32 / factor) as u32).max(1);
            let resized = image::imageops::resize(image, nw, nh, image::imageops::FilterType::Nearest);
            image::DynamicImage::ImageRgba8(resized).to_luma8()
        } else {
            image::DynamicImage::ImageRgba8(image.clone()).to_luma8()
        };

        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        tracing::debug!(grids = grids.len(), factor, "rqrr grids detected");

        let mut results: Vec<ScanResult> = Vec::with_capacity(grids.len());
        for grid in grids {
            let content = match grid.decode() {
                Ok((_, content)) => content,
                Err(e) => {
                    tracing::debug!(error = ?e, "grid failed to decode; skipping");
                    continue;
                }
            };

            let corners: Vec<(i32, i32)> = grid
                .bounds
                .iter()
                .map(|p| {
                    (
                        (p.x as f32 * factor).round() as i32,
                        (p.y as f32 * factor).round() as i32,
                    )
                })
                .collect();
            let bbox = Rect::bounding(&corners);

            let candidate = ScanResult::new(content, bbox);
            if is_duplicate(&results, &candidate) {
                continue;
            }
            results.push(candidate);
        }

        Ok(results)
    }
}

fn is_duplicate(existing: &[ScanResult], new: &ScanResult) -> bool {
    existing.iter().any(|e| {
        e.value == new.value
            && match (e.bounding_box, new.bounding_box) {
                (Some(a), Some(b)) => iou(&a, &b) > DUPLICATE_IOU,
                _ => true,
            }
    })
}

fn iou(a: &Rect, b: &Rect) -> f32 {
    let ix1 = a.left.max(b.left);
    let iy1 = a.top.max(b.top);
    let ix2 = a.right.min(b.right);
    let iy2 = a.bottom.min(b.bottom);

    let inter = ((ix2 - ix1).max(0) as f32) * ((iy2 - iy1).max(0) as f32);
    let area_a = a.width() as f32 * a.height() as f32;
    let area_b = b.width() as f32 * b.height() as f32;
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE_PX: u32 = 8;

    /// White canvas with `payload` painted as a QR code at `(ox, oy)`.
    /// Returns the image and the code's pixel area, quiet zone excluded.
    fn render_qr(payload: &str, canvas: (u32, u32), ox: u32, oy: u32) -> (RgbaImage, Rect) {
        let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colours = code.to_colors();
        let mut img = RgbaImage::from_pixel(canvas.0, canvas.1, image::Rgba([255, 255, 255, 255]));
        for (i, colour) in colours.iter().enumerate() {
            if *colour != qrcode::Color::Dark {
                continue;
            }
            let mx = i as u32 % modules;
            let my = i as u32 / modules;
            for dy in 0..MODULE_PX {
                for dx in 0..MODULE_PX {
                    img.put_pixel(
                        ox + mx * MODULE_PX + dx,
                        oy + my * MODULE_PX + dy,
                        image::Rgba([0, 0, 0, 255]),
                    );
                }
            }
        }
        let side = (modules * MODULE_PX) as i32;
        let area = Rect::new(ox as i32, oy as i32, ox as i32 + side, oy as i32 + side);
        (img, area)
    }

    fn assert_box_matches(bbox: Rect, area: Rect, tolerance: i32) {
        assert!((bbox.left - area.left).abs() <= tolerance, "{bbox:?} vs {area:?}");
        assert!((bbox.top - area.top).abs() <= tolerance, "{bbox:?} vs {area:?}");
        assert!((bbox.right - area.right).abs() <= tolerance, "{bbox:?} vs {area:?}");
        assert!((bbox.bottom - area.bottom).abs() <= tolerance, "{bbox:?} vs {area:?}");
    }

    #[test]
    fn decodes_rendered_code_at_full_resolution() {
        let payload = "https://example.com/scan?id=42";
        let (img, area) = render_qr(payload, (640, 480), 150, 100);

        let results = RqrrDecoder::new(0).decode(&img).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, payload);
        assert_eq!(results[0].kind, crate::perception::types::ValueKind::Url);
        assert_box_matches(results[0].bounding_box.unwrap(), area, MODULE_PX as i32);
    }

    #[test]
    fn downsampled_decode_reports_full_resolution_box() {
        let payload = "plain text payload";
        let (img, area) = render_qr(payload, (1600, 1200), 700, 500);

        let decoder = RqrrDecoder::new(800);
        assert_eq!(decoder.downsample_factor(1600, 1200), 2.0);
        let results = decoder.decode(&img).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, payload);
        // box is in source pixels, not in the halved luma image
        let bbox = results[0].bounding_box.unwrap();
        assert!(bbox.left > 600 && bbox.top > 400, "{bbox:?}");
        assert_box_matches(bbox, area, 2 * MODULE_PX as i32);
    }

    #[test]
    fn blank_frame_has_no_codes() {
        let img = RgbaImage::from_pixel(200, 120, image::Rgba([255, 255, 255, 255]));
        let results = RqrrDecoder::default().decode(&img).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn downsample_only_above_limit() {
        let decoder = RqrrDecoder::new(800);
        assert_eq!(decoder.downsample_factor(640, 480), 1.0);
        assert_eq!(decoder.downsample_factor(1600, 1200), 2.0);
        assert_eq!(RqrrDecoder::new(0).downsample_factor(4000, 3000), 1.0);
    }

    #[test]
    fn overlapping_same_value_is_duplicate() {
        let first = ScanResult::new("hello", Some(Rect::new(0, 0, 100, 100)));
        let near = ScanResult::new("hello", Some(Rect::new(5, 5, 105, 105)));
        let far = ScanResult::new("hello", Some(Rect::new(300, 300, 400, 400)));
        let other = ScanResult::new("world", Some(Rect::new(0, 0, 100, 100)));
        let existing = vec![first];
        assert!(is_duplicate(&existing, &near));
        assert!(!is_duplicate(&existing, &far));
        assert!(!is_duplicate(&existing, &other));
    }

    #[test]
    fn iou_of_disjoint_and_degenerate_boxes_is_zero() {
        assert_eq!(iou(&Rect::new(0, 0, 10, 10), &Rect::new(20, 20, 30, 30)), 0.0);
        assert_eq!(iou(&Rect::new(5, 5, 5, 5), &Rect::new(5, 5, 5, 5)), 0.0);
    }
}
