//! # Termination conditions
//!
//! A scenario runs until its termination condition is met, the operator
//! closes the visualizer, or (when no condition is configured) every
//! process has gone quiescent on its own. Conditions are pure predicates
//! over a point-in-time [`ScenarioSnapshot`]; the runner polls them at its
//! configured interval.
//!
//! All conditions quantify universally, so a snapshot with no processes
//! satisfies every condition vacuously.

use std::fmt;

use swarmsim_types::{DeviceId, ProcessStatus, Value};

/// A point-in-time observation of one process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessObservation {
    pub device: DeviceId,
    pub status: ProcessStatus,
    pub round: u64,
    pub executions: u64,
    pub value: Value,
}

/// A consistent set of per-process observations taken in one poll.
#[derive(Debug, Clone, Default)]
pub struct ScenarioSnapshot {
    pub observations: Vec<ProcessObservation>,
}

impl ScenarioSnapshot {
    /// True when every observed process is quiescent.
    pub fn all_quiescent(&self) -> bool {
        self.observations.iter().all(|o| o.status.is_quiescent())
    }
}

/// Decides whether a scenario has run long enough.
pub trait TerminationCondition: Send + Sync + fmt::Debug {
    /// Returns true when the scenario should stop.
    fn should_terminate(&self, snapshot: &ScenarioSnapshot) -> bool;
}

/// Never terminates; the run ends only via the visualizer or quiescence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl TerminationCondition for Never {
    fn should_terminate(&self, _snapshot: &ScenarioSnapshot) -> bool {
        false
    }
}

/// Met once every process has completed at least this many rounds.
#[derive(Debug, Clone, Copy)]
pub struct RoundCount(pub u64);

impl TerminationCondition for RoundCount {
    fn should_terminate(&self, snapshot: &ScenarioSnapshot) -> bool {
        snapshot.observations.iter().all(|o| o.round >= self.0)
    }
}

/// Met once every process has performed at least this many engine steps.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionCount(pub u64);

impl TerminationCondition for ExecutionCount {
    fn should_terminate(&self, snapshot: &ScenarioSnapshot) -> bool {
        snapshot.observations.iter().all(|o| o.executions >= self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(round: u64, executions: u64) -> ProcessObservation {
        ProcessObservation {
            device: DeviceId::int(round as i32),
            status: ProcessStatus::Run,
            round,
            executions,
            value: Value::Null,
        }
    }

    fn snapshot(obs: Vec<ProcessObservation>) -> ScenarioSnapshot {
        ScenarioSnapshot { observations: obs }
    }

    #[test]
    fn never_is_never_met() {
        assert!(!Never.should_terminate(&snapshot(vec![])));
        assert!(!Never.should_terminate(&snapshot(vec![observation(1_000_000, 1_000_000)])));
    }

    #[test]
    fn round_count_requires_every_process_to_reach_threshold() {
        let cond = RoundCount(5);
        assert!(!cond.should_terminate(&snapshot(vec![observation(5, 0), observation(4, 0)])));
        assert!(cond.should_terminate(&snapshot(vec![observation(5, 0), observation(7, 0)])));
    }

    #[test]
    fn execution_count_tracks_steps_not_rounds() {
        let cond = ExecutionCount(10);
        assert!(!cond.should_terminate(&snapshot(vec![observation(50, 9)])));
        assert!(cond.should_terminate(&snapshot(vec![observation(1, 10)])));
    }

    #[test]
    fn universal_conditions_hold_vacuously_on_empty_snapshots() {
        let empty = snapshot(vec![]);
        assert!(RoundCount(100).should_terminate(&empty));
        assert!(ExecutionCount(100).should_terminate(&empty));
        assert!(empty.all_quiescent());
    }

    #[test]
    fn quiescence_requires_every_process_stopped() {
        let mut obs = observation(1, 1);
        obs.status = ProcessStatus::Stop;
        let mut running = observation(2, 2);
        running.status = ProcessStatus::Run;

        assert!(!snapshot(vec![obs.clone(), running]).all_quiescent());
        assert!(snapshot(vec![obs]).all_quiescent());
    }
}
