mod lifecycle;
mod orchestrator;
mod resolution;
mod runtime;
mod stats;
mod types;

#[cfg(test)]
mod tests;

use crate::presenter::RecoveryAction;

pub use orchestrator::{CoordinatorSettings, ScanCoordinator, ScanCoordinatorBuilder};
pub use runtime::spawn_signal_handlers;
pub use stats::ScanStats;
pub use types::{ManualEntry, ScanCommand, ScanOutcome, ScanState};

/// Actions offered after any failure the user can recover from by trying again
const RECOVERABLE: &[RecoveryAction] = &[RecoveryAction::RetryScan, RecoveryAction::ManualEntry];
