//! Capture session: owns a frame source and pumps its frames into a
//! keep-only-latest channel while running.
//!
//! `start()` and `stop()` are idempotent; calling either in the state it
//! would produce returns `Ok(false)` and changes nothing.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::errors::QrLensResult;
use crate::perception::traits::FrameSource;
use crate::perception::types::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
    /// The source ran out of frames (or failed); `start()` reopens it.
    Finished,
}

pub type LatestFrame = Option<Arc<Frame>>;

pub struct CaptureSession {
    id: String,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    interval: Duration,
    opened: bool,
    pump: Option<JoinHandle<()>>,
    frame_tx: watch::Sender<LatestFrame>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

impl CaptureSession {
    pub fn new(source: Box<dyn FrameSource>, interval: Duration) -> Self {
        let (frame_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: Arc::new(Mutex::new(source)),
            interval,
            opened: false,
            pump: None,
            frame_tx,
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Receiver that always holds the newest frame; older frames are
    /// overwritten, never queued.
    pub fn frames(&self) -> watch::Receiver<LatestFrame> {
        self.frame_tx.subscribe()
    }

    pub fn states(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Acquire the source and begin pumping frames. Returns `Ok(true)` if
    /// the session transitioned to running.
    pub async fn start(&mut self) -> QrLensResult<bool> {
        if self.state() == SessionState::Running {
            return Ok(false);
        }
        self.reap_pump().await;

        if !self.opened || self.state() == SessionState::Finished {
            let mut source = self.source.lock().await;
            source.open().await?;
            self.opened = true;
        }

        self.state_tx.send_replace(SessionState::Running);
        let source = self.source.clone();
        let frame_tx = self.frame_tx.clone();
        let state_tx = self.state_tx.clone();
        let interval = self.interval;
        let session_id = self.id.clone();

        self.pump = Some(tokio::spawn(async move {
            pump_frames(session_id, source, frame_tx, state_tx, interval).await;
        }));

        tracing::info!(session = %self.id, "capture session started");
        Ok(true)
    }

    /// Release the source. Returns `Ok(true)` if a running session stopped.
    pub async fn stop(&mut self) -> QrLensResult<bool> {
        if self.state() != SessionState::Running {
            self.reap_pump().await;
            return Ok(false);
        }
        if let Some(handle) = self.pump.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.state_tx.send_replace(SessionState::Stopped);
        tracing::info!(session = %self.id, "capture session stopped");
        Ok(true)
    }

    async fn reap_pump(&mut self) {
        if let Some(handle) = self.pump.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.take() {
            handle.abort();
        }
    }
}

async fn pump_frames(
    session_id: String,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    frame_tx: watch::Sender<LatestFrame>,
    state_tx: Arc<watch::Sender<SessionState>>,
    interval: Duration,
) {
    loop {
        let next = {
            let mut source = source.lock().await;
            source.next_frame().await
        };
        match next {
            Ok(Some(frame)) => {
                tracing::trace!(session = %session_id, seq = frame.sequence, "frame captured");
                frame_tx.send_replace(Some(Arc::new(frame)));
            }
            Ok(None) => {
                tracing::info!(session = %session_id, "frame source exhausted");
                break;
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "frame capture failed");
                break;
            }
        }
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }
    state_tx.send_replace(SessionState::Finished);
}
