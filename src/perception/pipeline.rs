//! Frame analysis pipeline: decode a frame off the async runtime and map
//! its detections into preview space.
//!
//! 1. `DecodeTask::submit` turns the frame upright and runs the decoder on
//!    the blocking pool.
//! 2. Awaiting the task yields exactly one `DecodeOutcome`; the frame is
//!    released once the blocking job returns, whatever the outcome.
//! 3. `overlay_bounds` maps the last detection that carries a bounding box.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use image::RgbaImage;
use tokio::task::JoinHandle;

use crate::errors::{QrLensError, QrLensResult};
use crate::perception::mapper::{AxisMode, CoordinateMapper};
use crate::perception::traits::BarcodeDecoder;
use crate::perception::types::{Dimensions, Frame, Rect, Rotation, ScanResult};

/// A successfully decoded frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub sequence: u64,
    /// Sensor-native size of the source frame.
    pub dimensions: Dimensions,
    pub rotation: Rotation,
    pub upright: RgbaImage,
    pub results: Vec<ScanResult>,
}

/// Terminal result of one submitted frame.
#[derive(Debug)]
pub enum DecodeOutcome {
    Success(DecodedFrame),
    Failure { sequence: u64, error: QrLensError },
}

impl DecodeOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            DecodeOutcome::Success(decoded) => decoded.sequence,
            DecodeOutcome::Failure { sequence, .. } => *sequence,
        }
    }
}

/// Handle to a frame being decoded. Resolves once, to a `DecodeOutcome`.
pub struct DecodeTask {
    sequence: u64,
    handle: JoinHandle<QrLensResult<DecodedFrame>>,
}

impl DecodeTask {
    pub fn submit(decoder: Arc<dyn BarcodeDecoder>, frame: Arc<Frame>) -> Self {
        let sequence = frame.sequence;
        let handle = tokio::task::spawn_blocking(move || {
            let upright = frame.upright();
            let results = decoder.decode(&upright)?;
            Ok(DecodedFrame {
                sequence: frame.sequence,
                dimensions: frame.dimensions(),
                rotation: frame.rotation,
                upright,
                results,
            })
            // `frame` is dropped here, releasing this task's hold on its pixels.
        });
        Self { sequence, handle }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Future for DecodeTask {
    type Output = DecodeOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let sequence = self.sequence;
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(Ok(decoded)) => DecodeOutcome::Success(decoded),
            Ok(Err(error)) => DecodeOutcome::Failure { sequence, error },
            Err(join) if join.is_cancelled() => DecodeOutcome::Failure {
                sequence,
                error: QrLensError::Cancelled,
            },
            Err(join) => DecodeOutcome::Failure {
                sequence,
                error: QrLensError::Decode(format!("decoder panicked: {join}")),
            },
        })
    }
}

/// Mapper for a decoded frame shown on a `preview`-sized surface.
pub fn mapper_for(decoded: &DecodedFrame, preview: Dimensions) -> QrLensResult<CoordinateMapper> {
    CoordinateMapper::with_mode(decoded.dimensions, preview, AxisMode::from(decoded.rotation))
}

/// Preview-space bounds of the last detection that has a bounding box.
pub fn overlay_bounds(results: &[ScanResult], mapper: &CoordinateMapper) -> Option<Rect> {
    results
        .iter()
        .rev()
        .find_map(|r| r.bounding_box)
        .map(|b| mapper.map_rect(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDecoder(QrLensResult<Vec<ScanResult>>);

    impl BarcodeDecoder for FixedDecoder {
        fn name(&self) -> &str {
            "fixed"
        }

        fn decode(&self, _image: &RgbaImage) -> QrLensResult<Vec<ScanResult>> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(QrLensError::Decode(e.to_string())),
            }
        }
    }

    struct PanickingDecoder;

    impl BarcodeDecoder for PanickingDecoder {
        fn name(&self) -> &str {
            "panics"
        }

        fn decode(&self, _image: &RgbaImage) -> QrLensResult<Vec<ScanResult>> {
            panic!("decoder blew up")
        }
    }

    fn frame(rotation: Rotation) -> Arc<Frame> {
        Arc::new(Frame::new(7, RgbaImage::new(720, 1280), rotation))
    }

    #[tokio::test]
    async fn success_carries_upright_image_and_results() {
        let decoder = Arc::new(FixedDecoder(Ok(vec![ScanResult::new(
            "https://example.com",
            Some(Rect::new(1, 2, 3, 4)),
        )])));
        let frame = frame(Rotation::Deg90);
        let task = DecodeTask::submit(decoder, frame.clone());
        assert_eq!(task.sequence(), 7);

        match task.await {
            DecodeOutcome::Success(decoded) => {
                assert_eq!(decoded.sequence, 7);
                assert_eq!(decoded.upright.dimensions(), (1280, 720));
                assert_eq!(decoded.results.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // the task no longer holds the frame
        assert_eq!(Arc::strong_count(&frame), 1);
    }

    #[tokio::test]
    async fn decoder_error_is_a_failure_outcome() {
        let decoder = Arc::new(FixedDecoder(Err(QrLensError::Decode("bad".into()))));
        let outcome = DecodeTask::submit(decoder, frame(Rotation::Deg0)).await;
        assert_eq!(outcome.sequence(), 7);
        assert!(matches!(
            outcome,
            DecodeOutcome::Failure { error: QrLensError::Decode(_), .. }
        ));
    }

    #[tokio::test]
    async fn decoder_panic_is_a_failure_outcome() {
        let outcome = DecodeTask::submit(Arc::new(PanickingDecoder), frame(Rotation::Deg0)).await;
        assert!(matches!(outcome, DecodeOutcome::Failure { .. }));
    }

    #[test]
    fn overlay_uses_last_box_and_skips_boxless_results() {
        let mapper = CoordinateMapper::with_mode(
            Dimensions::new(100.0, 100.0),
            Dimensions::new(200.0, 200.0),
            AxisMode::Upright,
        )
        .unwrap();
        let results = vec![
            ScanResult::new("first", Some(Rect::new(0, 0, 10, 10))),
            ScanResult::new("second", Some(Rect::new(10, 10, 20, 20))),
            ScanResult::new("no box", None),
        ];
        assert_eq!(
            overlay_bounds(&results, &mapper),
            Some(Rect::new(20, 20, 40, 40))
        );
        assert_eq!(overlay_bounds(&results[2..], &mapper), None);
    }

    #[test]
    fn quarter_turn_frames_use_swapped_mapping() {
        let decoded = DecodedFrame {
            sequence: 0,
            dimensions: Dimensions::new(720.0, 1280.0),
            rotation: Rotation::Deg90,
            upright: RgbaImage::new(1, 1),
            results: Vec::new(),
        };
        let mapper = mapper_for(&decoded, Dimensions::new(1080.0, 2220.0)).unwrap();
        assert_eq!(
            mapper.map_rect(Rect::new(100, 200, 300, 400)),
            Rect::new(-1125, 617, -508, 1233)
        );
    }
}
