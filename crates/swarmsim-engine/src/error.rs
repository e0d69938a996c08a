//! Engine boundary error types.

use thiserror::Error;

/// Errors reported by an execution engine for a single round.
///
/// These are round-level failures: the owning process wrapper contains
/// them and treats the process as hung. They never abort the scenario.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Program evaluation failed for this round.
    #[error("program evaluation failed: {reason}")]
    Evaluation {
        /// Why evaluation failed.
        reason: String,
    },

    /// The program referenced a variable absent from the environment.
    #[error("unbound variable: {name}")]
    UnboundVariable {
        /// The missing variable name.
        name: String,
    },

    /// The engine itself is no longer usable.
    #[error("engine unavailable: {reason}")]
    Unavailable {
        /// Why the engine cannot run.
        reason: String,
    },
}
