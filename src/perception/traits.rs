use async_trait::async_trait;
use image::RgbaImage;

use crate::errors::QrLensResult;
use crate::perception::types::{Frame, ScanResult};

/// Strategy trait for barcode decoding.
/// Runs on the blocking pool, so implementations may be CPU-heavy.
pub trait BarcodeDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Decode every code visible in an upright image. Bounding boxes are in
    /// the upright image's pixel space.
    fn decode(&self, image: &RgbaImage) -> QrLensResult<Vec<ScanResult>>;
}

/// A producer of camera-like frames.
#[async_trait]
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Check the source is usable (device present, access granted).
    async fn open(&mut self) -> QrLensResult<()>;

    /// Next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> QrLensResult<Option<Frame>>;
}
