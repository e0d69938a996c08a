//! # swarmsim-engine: Execution-engine boundary
//!
//! The testbed does not evaluate node programs itself; it drives an opaque
//! engine once per round through [`StepEngine`]. An engine takes the node's
//! current [`Environment`], evaluates one round of the externally supplied
//! program, and returns the round's value together with the updated
//! environment.
//!
//! A failed `step` means "this round failed", never "the scenario failed":
//! the process wrapper contains the error and treats the process as hung.

mod env;
mod error;

pub use env::Environment;
pub use error::EngineError;

use swarmsim_types::Value;

/// One round of program execution for a single node.
///
/// Implementations must tolerate being called repeatedly; each call is an
/// independent round. Engines run on the owning process's execution thread,
/// hence the `Send` bound.
pub trait StepEngine: Send {
    /// Executes one round against the given environment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if this round's evaluation failed. The error
    /// is contained to the owning process.
    fn step(&mut self, env: Environment) -> Result<(Value, Environment), EngineError>;
}

/// An engine that yields the same value every round.
///
/// Useful for development and for scenario tests that only exercise
/// lifecycle and orchestration, not program semantics.
#[derive(Debug, Clone)]
pub struct FixedStepEngine {
    value: Value,
}

impl FixedStepEngine {
    /// Creates an engine that yields `value` every round.
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl StepEngine for FixedStepEngine {
    fn step(&mut self, env: Environment) -> Result<(Value, Environment), EngineError> {
        Ok((self.value.clone(), env))
    }
}
