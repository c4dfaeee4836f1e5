//! Commands, notices and lifecycle states of the scan engine.
use crate::perception::session::SessionState;

/// Lifecycle of the scanner as observed by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerState {
    Idle,
    Scanning,
    Paused,
    /// The frame source has no more frames.
    Exhausted,
}

impl From<SessionState> for ScannerState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Idle => ScannerState::Idle,
            SessionState::Running => ScannerState::Scanning,
            SessionState::Stopped => ScannerState::Paused,
            SessionState::Finished => ScannerState::Exhausted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum ScanCommand {
    Start,
    Stop,
    /// Open the list entry at this position.
    Open(usize),
    List,
    Shutdown,
}

/// Short user-facing failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    PermissionDenied,
    BindingFailed,
    ScanFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::PermissionDenied => "Permission not granted",
            Notice::BindingFailed => "Use case binding failed",
            Notice::ScanFailed => "Failed to scan barcode",
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
