use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::AppConfig;
use crate::display::list::ScanList;
use crate::display::overlay::{parse_colour, OverlayView};
use crate::display::snapshot::{DisplayMode, DisplayState};
use crate::engine::event_bus::{EventBus, ScanMessage};
use crate::engine::state::{Notice, ScanCommand, ScannerState};
use crate::errors::{QrLensError, QrLensResult};
use crate::executor::launcher::UrlLauncher;
use crate::perception::annotator::{render_preview, StrokeStyle};
use crate::perception::pipeline::{mapper_for, overlay_bounds, DecodeOutcome, DecodeTask, DecodedFrame};
use crate::perception::session::{CaptureSession, SessionState};
use crate::perception::traits::BarcodeDecoder;
use crate::perception::types::{Dimensions, Frame};

/// Display-side settings of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub preview: Dimensions,
    pub display_mode: DisplayMode,
    pub max_entries: usize,
    pub stroke: StrokeStyle,
    /// When set, every overlay update is also written as a PNG here.
    pub overlay_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preview: Dimensions::new(1080.0, 1920.0),
            display_mode: DisplayMode::default(),
            max_entries: 50,
            stroke: StrokeStyle::default(),
            overlay_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> QrLensResult<Self> {
        Ok(Self {
            preview: Dimensions::new(config.preview.width, config.preview.height),
            display_mode: config.scanner.display_mode,
            max_entries: config.scanner.max_entries,
            stroke: StrokeStyle {
                colour: parse_colour(&config.overlay.color)?,
                width: config.overlay.stroke_width,
            },
            overlay_dir: config.output.overlay_dir.clone(),
        })
    }
}

/// Drives capture, decoding and display from a single task.
pub struct ScanEngine {
    session: CaptureSession,
    decoder: Arc<dyn BarcodeDecoder>,
    launcher: Arc<dyn UrlLauncher>,
    display: DisplayState,
    list: ScanList,
    overlay: OverlayView,
    bus: EventBus,
    settings: EngineSettings,
}

impl ScanEngine {
    pub fn new(
        session: CaptureSession,
        decoder: Arc<dyn BarcodeDecoder>,
        launcher: Arc<dyn UrlLauncher>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            session,
            decoder,
            launcher,
            display: DisplayState::new(settings.display_mode, settings.max_entries),
            list: ScanList::default(),
            overlay: OverlayView::new(settings.stroke),
            bus: EventBus::new(),
            settings,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanMessage> {
        self.bus.subscribe()
    }

    pub fn command_sender(&self) -> mpsc::Sender<ScanCommand> {
        self.bus.command_sender()
    }

    pub async fn run_loop(mut self) {
        let mut frames = self.session.frames();
        let mut states = self.session.states();
        tracing::info!(
            session = %self.session.id(),
            decoder = self.decoder.name(),
            mode = ?self.settings.display_mode,
            "scan engine ready"
        );

        loop {
            tokio::select! {
                command = self.bus.recv_command() => match command {
                    Some(ScanCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                changed = frames.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = frames.borrow_and_update().clone();
                    if let Some(frame) = latest {
                        self.analyse(frame).await;
                    }
                },
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *states.borrow_and_update();
                    tracing::info!(state = ?state, "session state changed");
                    self.bus.publish(ScanMessage::StateChanged {
                        state: ScannerState::from(state),
                    });
                },
            }
        }

        if let Err(e) = self.session.stop().await {
            tracing::warn!(error = %e, "failed to stop capture session on shutdown");
        }
        tracing::info!("scan engine exited");
    }

    async fn handle_command(&mut self, command: ScanCommand) {
        tracing::debug!(command = ?command, "command received");
        match command {
            ScanCommand::Start => match self.session.start().await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("capture already running"),
                Err(QrLensError::PermissionDenied(detail)) => {
                    tracing::warn!(detail = %detail, "frame source permission denied");
                    self.notify(Notice::PermissionDenied, Some(detail));
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to bind frame source");
                    self.notify(Notice::BindingFailed, Some(e.to_string()));
                }
            },
            ScanCommand::Stop => match self.session.stop().await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("capture not running"),
                Err(e) => tracing::warn!(error = %e, "failed to stop capture"),
            },
            ScanCommand::Open(position) => {
                match self.list.activate(position, self.launcher.as_ref()).await {
                    Ok(true) => {
                        let url = self.list.bind(position).map(|i| i.text).unwrap_or_default();
                        self.bus.publish(ScanMessage::UrlOpened { position, url });
                    }
                    Ok(false) => tracing::info!(position, "nothing to open at position"),
                    Err(e) => tracing::warn!(position, error = %e, "failed to open URL"),
                }
            }
            ScanCommand::List => {
                self.bus.publish(ScanMessage::ListRendered {
                    items: self.list.items(),
                });
            }
            // handled by the loop
            ScanCommand::Shutdown => {}
        }
    }

    async fn analyse(&mut self, frame: Arc<Frame>) {
        if matches!(
            self.session.state(),
            SessionState::Idle | SessionState::Stopped
        ) {
            tracing::trace!(seq = frame.sequence, "skipping frame from stopped session");
            return;
        }

        let outcome = DecodeTask::submit(self.decoder.clone(), frame).await;
        tracing::trace!(seq = outcome.sequence(), "frame released");

        match outcome {
            DecodeOutcome::Success(decoded) => self.present(decoded),
            DecodeOutcome::Failure { sequence, error } => {
                tracing::warn!(seq = sequence, error = %error, "barcode scanning failed");
                self.notify(Notice::ScanFailed, Some(error.to_string()));
            }
        }
    }

    fn present(&mut self, decoded: DecodedFrame) {
        let sequence = decoded.sequence;
        if let Some(diff) = self.display.apply(&decoded.results) {
            for entry in &diff.added {
                tracing::info!(seq = sequence, kind = ?entry.kind, value = %entry.value, "code scanned");
            }
            self.list.submit(self.display.snapshot().clone());
            self.bus.publish(ScanMessage::SnapshotChanged {
                sequence,
                diff,
                total: self.list.item_count(),
            });
        }

        let mapper = match mapper_for(&decoded, self.settings.preview) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "cannot map detections to preview");
                return;
            }
        };
        let Some(bounds) = overlay_bounds(&decoded.results, &mapper) else {
            return;
        };
        if !self.overlay.set_bounds(Some(bounds)) {
            self.overlay.invalidate();
        }
        self.bus.publish(ScanMessage::OverlayUpdated {
            sequence,
            bounds: Some(bounds),
            generation: self.overlay.generation(),
        });

        if let Some(dir) = &self.settings.overlay_dir {
            let written = render_preview(&decoded.upright, &mapper)
                .and_then(|preview| self.overlay.write_png(&preview, dir, sequence));
            if let Err(e) = written {
                tracing::warn!(seq = sequence, error = %e, "failed to write overlay image");
            }
        }
    }

    fn notify(&self, notice: Notice, detail: Option<String>) {
        self.bus.publish(ScanMessage::Notice { notice, detail });
    }
}
