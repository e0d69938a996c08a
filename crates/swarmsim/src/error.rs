//! Error types for scenario orchestration.

use swarmsim_types::DeviceId;

/// Errors raised while rewinding a message log.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RewindError {
    /// The log is empty; there is no history left to discard.
    #[error("message log exhausted, no history left to rewind")]
    Exhausted,
}

/// Errors raised while building, starting, or running a scenario.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A process was asked to start a second time.
    #[error("process {device} already started")]
    AlreadyStarted { device: DeviceId },

    /// The OS refused to spawn the process thread.
    #[error("failed to spawn thread for process {device}")]
    SpawnFailed {
        device: DeviceId,
        #[source]
        source: std::io::Error,
    },

    /// The runner was driven out of order.
    #[error("scenario runner already consumed ({phase})")]
    InvalidPhase { phase: &'static str },

    /// A rewind failed in a context where exhaustion is not tolerated.
    #[error(transparent)]
    Rewind(#[from] RewindError),
}
