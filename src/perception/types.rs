use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in integer pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Smallest rectangle enclosing every point. `None` for an empty slice.
    pub fn bounding(points: &[(i32, i32)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let mut rect = Rect::new(x0, y0, x0, y0);
        for &(x, y) in rest {
            rect.left = rect.left.min(x);
            rect.top = rect.top.min(y);
            rect.right = rect.right.max(x);
            rect.bottom = rect.bottom.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_ordered(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    pub fn is_degenerate(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }
}

/// Pixel size of a coordinate space. Not validated on construction; the
/// mapper rejects non-positive or non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn of_image(image: &RgbaImage) -> Self {
        Self::new(image.width() as f64, image.height() as f64)
    }
}

/// Clockwise rotation needed to turn a sensor-native frame upright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when sensor width runs along the display's vertical axis.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Url,
    Text,
}

impl ValueKind {
    /// `http://` and `https://` values are URLs, everything else is text.
    pub fn classify(value: &str) -> Self {
        if is_web_url(value) {
            ValueKind::Url
        } else {
            ValueKind::Text
        }
    }
}

pub(crate) fn is_web_url(value: &str) -> bool {
    static WEB_URL: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    WEB_URL
        .get_or_init(|| regex::Regex::new(r"(?i)^https?://\S").expect("static URL pattern"))
        .is_match(value)
}

/// One detection produced by the decoder for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub kind: ValueKind,
    pub value: String,
    /// In upright-frame pixel coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,
}

impl ScanResult {
    pub fn new(value: impl Into<String>, bounding_box: Option<Rect>) -> Self {
        let value = value.into();
        Self {
            kind: ValueKind::classify(&value),
            value,
            bounding_box,
        }
    }
}

/// A captured frame in sensor-native orientation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub image: RgbaImage,
    pub rotation: Rotation,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbaImage, rotation: Rotation) -> Self {
        Self {
            sequence,
            image,
            rotation,
            captured_at: chrono::Utc::now(),
        }
    }

    /// Sensor-native size (before rotation).
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of_image(&self.image)
    }

    /// The frame turned upright, as handed to the decoder.
    pub fn upright(&self) -> RgbaImage {
        match self.rotation {
            Rotation::Deg0 => self.image.clone(),
            Rotation::Deg90 => image::imageops::rotate90(&self.image),
            Rotation::Deg180 => image::imageops::rotate180(&self.image),
            Rotation::Deg270 => image::imageops::rotate270(&self.image),
        }
    }
}
