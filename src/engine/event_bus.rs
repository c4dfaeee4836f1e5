use serde::Serialize;
use tokio::sync::broadcast::error::SendError;
use tokio::sync::{broadcast, mpsc};

use crate::display::list::ListItem;
use crate::display::snapshot::SnapshotDiff;
use crate::engine::state::{Notice, ScanCommand, ScannerState};
use crate::perception::types::Rect;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanMessage {
    StateChanged {
        state: ScannerState,
    },
    SnapshotChanged {
        sequence: u64,
        diff: SnapshotDiff,
        total: usize,
    },
    OverlayUpdated {
        sequence: u64,
        bounds: Option<Rect>,
        generation: u64,
    },
    ListRendered {
        items: Vec<ListItem>,
    },
    UrlOpened {
        position: usize,
        url: String,
    },
    Notice {
        notice: Notice,
        detail: Option<String>,
    },
}

pub struct EventBus {
    tx: broadcast::Sender<ScanMessage>,
    command_tx: mpsc::Sender<ScanCommand>,
    command_rx: mpsc::Receiver<ScanCommand>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        let (command_tx, command_rx) = mpsc::channel(100);

        Self {
            tx,
            command_tx,
            command_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanMessage> {
        self.tx.subscribe()
    }

    pub fn send(&self, msg: ScanMessage) -> Result<(), SendError<ScanMessage>> {
        self.tx.send(msg).map(|_| ())
    }

    /// Publish, ignoring the case where nobody is listening.
    pub fn publish(&self, msg: ScanMessage) {
        if self.send(msg).is_err() {
            tracing::trace!("no event subscribers");
        }
    }

    pub fn command_sender(&self) -> mpsc::Sender<ScanCommand> {
        self.command_tx.clone()
    }

    pub async fn recv_command(&mut self) -> Option<ScanCommand> {
        self.command_rx.recv().await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
