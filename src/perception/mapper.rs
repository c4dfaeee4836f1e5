//! Maps bounding boxes from camera-frame pixel space into preview pixel space.
//!
//! The preview shows the upright frame scaled uniformly until it covers the
//! whole preview (fill / center-crop), with the overflow split evenly on both
//! sides of the cropped axis. In quarter-turn mode the frame's sensor-native
//! width runs along the preview's vertical axis, so the image aspect ratio is
//! taken as `height / width`.
use crate::errors::{QrLensError, QrLensResult};
use crate::perception::types::{Dimensions, Rect, Rotation};

/// How sensor-native image axes relate to preview axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisMode {
    /// Sensor output is a quarter turn away from the preview.
    #[default]
    QuarterTurn,
    /// Sensor output already has the preview's orientation.
    Upright,
}

impl From<Rotation> for AxisMode {
    fn from(rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            AxisMode::QuarterTurn
        } else {
            AxisMode::Upright
        }
    }
}

/// Precomputed scale and centering offsets for one image/preview geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    preview: Dimensions,
}

impl CoordinateMapper {
    /// Quarter-turn mapper, the orientation of a portrait preview fed by a
    /// landscape sensor.
    pub fn new(image: Dimensions, preview: Dimensions) -> QrLensResult<Self> {
        Self::with_mode(image, preview, AxisMode::QuarterTurn)
    }

    pub fn with_mode(image: Dimensions, preview: Dimensions, mode: AxisMode) -> QrLensResult<Self> {
        check_dimension("image_width", image.width)?;
        check_dimension("image_height", image.height)?;
        check_dimension("preview_width", preview.width)?;
        check_dimension("preview_height", preview.height)?;

        // Size of the image as it appears on the preview's axes.
        let (shown_w, shown_h) = match mode {
            AxisMode::QuarterTurn => (image.height, image.width),
            AxisMode::Upright => (image.width, image.height),
        };

        let aspect_ratio_preview = preview.width / preview.height;
        let aspect_ratio_image = shown_w / shown_h;

        let (scale, offset_x, offset_y) = if aspect_ratio_preview > aspect_ratio_image {
            let scale = preview.width / shown_w;
            (scale, 0.0, (preview.height - shown_h * scale) / 2.0)
        } else {
            let scale = preview.height / shown_h;
            (scale, (preview.width - shown_w * scale) / 2.0, 0.0)
        };

        Ok(Self {
            scale,
            offset_x,
            offset_y,
            preview,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    pub fn preview(&self) -> Dimensions {
        self.preview
    }

    /// Scale about the origin, translate, round to the nearest pixel.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let x = |v: i32| (v as f64 * self.scale + self.offset_x).round() as i32;
        let y = |v: i32| (v as f64 * self.scale + self.offset_y).round() as i32;
        let (left, right) = (x(rect.left), x(rect.right));
        let (top, bottom) = (y(rect.top), y(rect.bottom));
        // scale > 0 and rounding is monotonic, so ordering already holds;
        // min/max keeps unordered input from producing an inverted box.
        Rect::new(left.min(right), top.min(bottom), left.max(right), top.max(bottom))
    }
}

/// One-shot form: map `bounding_box` from a `image_width × image_height`
/// sensor frame into a `preview_width × preview_height` preview.
pub fn map(
    bounding_box: Rect,
    image_width: f64,
    image_height: f64,
    preview_width: f64,
    preview_height: f64,
) -> QrLensResult<Rect> {
    let mapper = CoordinateMapper::new(
        Dimensions::new(image_width, image_height),
        Dimensions::new(preview_width, preview_height),
    )?;
    Ok(mapper.map_rect(bounding_box))
}

fn check_dimension(name: &'static str, value: f64) -> QrLensResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QrLensError::InvalidDimension { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_fixture_portrait_preview() {
        let mapper =
            CoordinateMapper::new(Dimensions::new(720.0, 1280.0), Dimensions::new(1080.0, 2220.0))
                .unwrap();
        assert!((mapper.scale() - 2220.0 / 720.0).abs() < 1e-9);
        let (dx, dy) = mapper.offset();
        assert!((dx - (1080.0 - 1280.0 * 2220.0 / 720.0) / 2.0).abs() < 1e-9);
        assert_eq!(dy, 0.0);

        let out = mapper.map_rect(Rect::new(100, 200, 300, 400));
        assert_eq!(out, Rect::new(-1125, 617, -508, 1233));
    }

    #[test]
    fn wide_preview_takes_vertical_offset() {
        // preview aspect 2.0 > rotated image aspect 720/1280
        let out = map(Rect::new(0, 0, 720, 1280), 1280.0, 720.0, 2000.0, 1000.0).unwrap();
        let mapper =
            CoordinateMapper::new(Dimensions::new(1280.0, 720.0), Dimensions::new(2000.0, 1000.0))
                .unwrap();
        assert_eq!(mapper.offset().0, 0.0);
        assert!(mapper.offset().1 < 0.0);
        assert_eq!(out.left, 0);
        assert_eq!(out.right, 2000);
    }

    #[test]
    fn rotated_matching_aspect_has_no_offset() {
        let mapper =
            CoordinateMapper::new(Dimensions::new(1920.0, 1080.0), Dimensions::new(1080.0, 1920.0))
                .unwrap();
        assert_eq!(mapper.offset(), (0.0, 0.0));
        assert_eq!(mapper.scale(), 1.0);
        let full = mapper.map_rect(Rect::new(0, 0, 1080, 1920));
        assert_eq!(full, Rect::new(0, 0, 1080, 1920));
    }

    #[test]
    fn identical_sizes_crop_horizontally() {
        // 1080x1920 sensor shown rotated is 1920 wide, so it overflows the preview width.
        let mapper =
            CoordinateMapper::new(Dimensions::new(1080.0, 1920.0), Dimensions::new(1080.0, 1920.0))
                .unwrap();
        assert_eq!(mapper.offset().1, 0.0);
        assert!((mapper.scale() - 1920.0 / 1080.0).abs() < 1e-12);
        assert!(mapper.offset().0 < 0.0);
    }

    #[test]
    fn upright_mode_keeps_axes() {
        let mapper = CoordinateMapper::with_mode(
            Dimensions::new(1920.0, 1080.0),
            Dimensions::new(960.0, 540.0),
            AxisMode::Upright,
        )
        .unwrap();
        assert_eq!(mapper.scale(), 0.5);
        assert_eq!(mapper.offset(), (0.0, 0.0));
        assert_eq!(
            mapper.map_rect(Rect::new(100, 50, 300, 250)),
            Rect::new(50, 25, 150, 125)
        );
        assert_eq!(AxisMode::from(Rotation::Deg90), AxisMode::QuarterTurn);
        assert_eq!(AxisMode::from(Rotation::Deg180), AxisMode::Upright);
    }

    #[test]
    fn degenerate_box_stays_degenerate() {
        let out = map(Rect::new(10, 10, 10, 10), 640.0, 480.0, 1080.0, 2220.0).unwrap();
        assert_eq!(out.left, out.right);
        assert_eq!(out.top, out.bottom);
    }

    #[test]
    fn mapping_is_deterministic_and_ordered() {
        let geometries = [
            (640.0, 480.0, 1080.0, 2220.0),
            (1920.0, 1080.0, 1080.0, 1920.0),
            (480.0, 640.0, 2000.0, 500.0),
            (33.0, 77.0, 19.0, 101.0),
        ];
        let boxes = [
            Rect::new(0, 0, 1, 1),
            Rect::new(-20, 5, 17, 9),
            Rect::new(3, 3, 3, 400),
            Rect::new(123, 77, 480, 478),
        ];
        for &(iw, ih, pw, ph) in &geometries {
            for &b in &boxes {
                let first = map(b, iw, ih, pw, ph).unwrap();
                let second = map(b, iw, ih, pw, ph).unwrap();
                assert_eq!(first, second);
                assert!(first.is_ordered(), "{b:?} -> {first:?}");
            }
        }
    }

    #[test]
    fn box_inside_image_lands_inside_preview() {
        let (iw, ih, pw, ph) = (1920.0, 1080.0, 1080.0, 1920.0);
        let out = map(Rect::new(0, 0, 1080, 1920), iw, ih, pw, ph).unwrap();
        assert!(out.left >= 0 && out.top >= 0);
        assert!(out.right <= 1080 && out.bottom <= 1920);
    }

    #[test]
    fn zero_preview_width_is_invalid() {
        let err = map(Rect::new(1, 2, 3, 4), 720.0, 1280.0, 0.0, 2220.0).unwrap_err();
        assert!(matches!(
            err,
            QrLensError::InvalidDimension { name: "preview_width", .. }
        ));
    }

    #[test]
    fn negative_and_nan_dimensions_are_invalid() {
        for (iw, ih, pw, ph) in [
            (-1.0, 10.0, 10.0, 10.0),
            (10.0, 0.0, 10.0, 10.0),
            (10.0, 10.0, 10.0, -5.0),
            (f64::NAN, 10.0, 10.0, 10.0),
            (10.0, f64::INFINITY, 10.0, 10.0),
        ] {
            assert!(matches!(
                map(Rect::default(), iw, ih, pw, ph),
                Err(QrLensError::InvalidDimension { .. })
            ));
        }
    }
}
