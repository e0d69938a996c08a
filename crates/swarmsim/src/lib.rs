//! # swarmsim: a testbed for simulated swarms of node processes
//!
//! Simulates populations of long-running, independently scheduled node
//! processes over a logical network, with fault injection and forensic
//! rewind of message history.
//!
//! # Architecture
//!
//! ```text
//!   ScenarioRunner ── polls ──> TerminationCondition
//!        │                            │
//!        │ starts / stops             │ reads
//!        v                            v
//!   ProcessWrapper (one thread each) ── observations
//!        │        │
//!        │ steps  │ appends / rewinds
//!        v        v
//!    StepEngine  MessageLog <── SafetyProbe
//!        ^
//!        │ per round
//!    AttackModel ──> Attack::apply
//! ```
//!
//! A [`Scenario`] is built once and stays immutable for a run. The
//! [`ScenarioRunner`] initializes every [`ProcessWrapper`], each of which
//! runs its execution loop on a dedicated thread: step the engine, apply
//! the active attacks, rewind unsafe history, publish the round result,
//! sleep. The runner polls the termination condition (or the visualizer,
//! or the all-quiescent fallback) and then drains everything cooperatively
//! at round boundaries.

pub mod error;
pub mod log;
pub mod oracle;
pub mod process;
pub mod runner;
pub mod scenario;
pub mod termination;
pub mod visual;

pub use error::{RewindError, SimError};
pub use log::{MessageLog, SafetyProbe};
pub use oracle::{compare_results, Mismatch, OracleError};
pub use process::{ProcessConfig, ProcessWrapper, ScenarioContext};
pub use runner::{RunReport, RunnerPhase, ScenarioRunner};
pub use scenario::{Link, LinkKind, Scenario, ScenarioBuilder};
pub use termination::{
    ExecutionCount, Never, ProcessObservation, RoundCount, ScenarioSnapshot, TerminationCondition,
};
pub use visual::{HeadlessVisualizer, Visualizer};

pub use swarmsim_attack::{
    Attack, AttackEffect, AttackModel, AttackTarget, BroadcastAttack, NoAttackModel,
    SpecificAttack, TargetedAttackModel,
};
pub use swarmsim_engine::{EngineError, Environment, FixedStepEngine, StepEngine};
pub use swarmsim_types::{
    DeviceId, Direction, Message, ProcessStatus, SessionToken, Value,
};
