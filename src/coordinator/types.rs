use crate::resolver::ScanType;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Scanner view state, owned and mutated only by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Idle,
    AwaitingCamera,
    Scanning,
    Resolving,
    Error,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::AwaitingCamera => "awaiting camera",
            ScanState::Scanning => "scanning",
            ScanState::Resolving => "resolving",
            ScanState::Error => "error",
        };
        f.write_str(name)
    }
}

/// An identifier typed in by the user instead of scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEntry {
    pub code: String,
    pub entry_type: ScanType,
}

impl ManualEntry {
    pub fn new<S: Into<String>>(code: S, entry_type: ScanType) -> Self {
        Self {
            code: code.into(),
            entry_type,
        }
    }
}

/// User or system requests driving the coordinator's run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanCommand {
    Start,
    Stop,
    Retry,
    Manual(ManualEntry),
    Shutdown,
}

/// How a scanner view ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A code resolved and the view navigated away
    Navigated(String),
    /// The view closed while showing an error
    Failed(String),
    /// The view closed without a result
    Closed,
}

#[derive(Debug, Clone)]
pub(super) struct PendingNavigation {
    pub target: String,
    pub deadline: Instant,
}
