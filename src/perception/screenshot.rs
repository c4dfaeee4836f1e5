//! Live screen capture as a frame source (`screen-capture` feature).
use async_trait::async_trait;

use crate::errors::{QrLensError, QrLensResult};
use crate::perception::traits::FrameSource;
use crate::perception::types::{Frame, Rotation};

pub struct ScreenSource {
    /// Monitor index; `None` selects the primary monitor.
    monitor: Option<usize>,
    sequence: u64,
}

impl ScreenSource {
    pub fn new(monitor: Option<usize>) -> Self {
        Self {
            monitor,
            sequence: 0,
        }
    }
}

#[cfg(feature = "screen-capture")]
fn pick_monitor(index: Option<usize>) -> QrLensResult<xcap::Monitor> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| QrLensError::PermissionDenied(format!("enumerate monitors: {e}")))?;
    let picked = match index {
        Some(i) => monitors.into_iter().nth(i),
        None => monitors.into_iter().find(|m| m.is_primary()),
    };
    picked.ok_or_else(|| QrLensError::Capture("no matching monitor".into()))
}

#[cfg(feature = "screen-capture")]
fn capture(index: Option<usize>) -> QrLensResult<image::RgbaImage> {
    let monitor = pick_monitor(index)?;
    monitor
        .capture_image()
        .map_err(|e| QrLensError::Capture(format!("screen capture: {e}")))
}

#[cfg(not(feature = "screen-capture"))]
fn capture(_index: Option<usize>) -> QrLensResult<image::RgbaImage> {
    Err(QrLensError::Capture(
        "screen capture support not compiled in (enable the `screen-capture` feature)".into(),
    ))
}

#[async_trait]
impl FrameSource for ScreenSource {
    fn name(&self) -> &str {
        "screen"
    }

    async fn open(&mut self) -> QrLensResult<()> {
        let monitor = self.monitor;
        let probe = tokio::task::spawn_blocking(move || capture(monitor))
            .await
            .map_err(|e| QrLensError::Capture(format!("screen probe join: {e}")))??;
        tracing::info!(
            width = probe.width(),
            height = probe.height(),
            "screen source opened"
        );
        Ok(())
    }

    async fn next_frame(&mut self) -> QrLensResult<Option<Frame>> {
        let monitor = self.monitor;
        let image = tokio::task::spawn_blocking(move || capture(monitor))
            .await
            .map_err(|e| QrLensError::Capture(format!("screen capture join: {e}")))??;
        let frame = Frame::new(self.sequence, image, Rotation::Deg0);
        self.sequence += 1;
        Ok(Some(frame))
    }
}
