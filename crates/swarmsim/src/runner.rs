//! # Scenario runner
//!
//! The runner orchestrates exactly one run of one scenario:
//!
//! 1. generate a fresh session token and initialize every process wrapper
//!    (start order is irrelevant; processes must not depend on it),
//! 2. start the visualizer when one is attached,
//! 3. poll until the visualizer is closed, the termination condition is
//!    met, or, absent a condition, every process has gone quiescent on
//!    its own,
//! 4. drain: signal stop everywhere, tear down the visualizer, join every
//!    execution loop, and wait for full quiescence before reading final
//!    values.
//!
//! The poll loop only reads wrapper snapshots and issues stop signals; it
//! never executes rounds itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use swarmsim_attack::{AttackModel, NoAttackModel};
use swarmsim_types::{DeviceId, SessionToken, Value};
use tracing::{debug, info};

use crate::error::SimError;
use crate::process::ScenarioContext;
use crate::scenario::Scenario;
use crate::visual::Visualizer;

/// Where the runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    NotStarted,
    Running,
    Draining,
    Done,
}

/// Final values and round counters read after full quiescence.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session: SessionToken,
    pub values: HashMap<DeviceId, Value>,
    pub rounds: HashMap<DeviceId, u64>,
}

/// Transient orchestrator for one scenario run.
///
/// All simulation state lives in the scenario's wrappers; the runner holds
/// only the scenario, an optional visualizer, and the attack model.
pub struct ScenarioRunner {
    scenario: Scenario,
    visualizer: Option<Box<dyn Visualizer>>,
    attacks: Arc<dyn AttackModel>,
    phase: RunnerPhase,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            visualizer: None,
            attacks: Arc::new(NoAttackModel),
            phase: RunnerPhase::NotStarted,
        }
    }

    /// Attaches a visualizer. It is used only when the scenario's
    /// visualize flag is set; the runner behaves identically without one.
    pub fn with_visualizer(mut self, visualizer: Box<dyn Visualizer>) -> Self {
        self.visualizer = Some(visualizer);
        self
    }

    pub fn with_attack_model(mut self, attacks: Arc<dyn AttackModel>) -> Self {
        self.attacks = attacks;
        self
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    /// Runs the scenario to completion and returns the final values.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        if self.phase != RunnerPhase::NotStarted {
            return Err(SimError::InvalidPhase {
                phase: "runner already consumed",
            });
        }
        self.phase = RunnerPhase::Running;

        let session = SessionToken::generate();
        info!(
            scenario = %self.scenario.name(),
            session = %session,
            processes = self.scenario.len(),
            "scenario starting"
        );

        let base_port = self.scenario.base_port();
        let mut init_error = None;
        for (index, wrapper) in self.scenario.processes().enumerate() {
            // Saturate rather than overflow when the range runs out.
            let port = (u32::from(base_port))
                .saturating_add(index as u32)
                .min(u32::from(u16::MAX)) as u16;
            let ctx = ScenarioContext {
                session,
                attacks: Arc::clone(&self.attacks),
                port,
            };
            if let Err(err) = wrapper.initialize(&ctx) {
                init_error = Some(err);
                break;
            }
        }
        if let Some(err) = init_error {
            self.drain();
            return Err(err);
        }

        // An attached visualizer counts only when the scenario asks for
        // one; otherwise the run proceeds as if none were attached.
        if !self.scenario.visualize() && self.visualizer.take().is_some() {
            debug!(scenario = %self.scenario.name(), "visualize disabled, ignoring visualizer");
        }
        if let Some(vis) = self.visualizer.as_mut() {
            vis.start();
        }

        let poll_interval = self.scenario.poll_interval();
        loop {
            if self.visualizer.as_ref().is_some_and(|v| v.is_closed()) {
                info!(scenario = %self.scenario.name(), "visualizer closed, ending run");
                break;
            }

            let snapshot = self.scenario.snapshot();
            match self.scenario.termination() {
                Some(condition) => {
                    if condition.should_terminate(&snapshot) {
                        debug!(scenario = %self.scenario.name(), "termination condition met");
                        break;
                    }
                }
                None => {
                    if snapshot.all_quiescent() {
                        debug!(scenario = %self.scenario.name(), "all processes quiescent");
                        break;
                    }
                }
            }

            thread::sleep(poll_interval);
        }

        self.drain();

        let mut values = HashMap::with_capacity(self.scenario.len());
        let mut rounds = HashMap::with_capacity(self.scenario.len());
        for wrapper in self.scenario.processes() {
            values.insert(wrapper.device().clone(), wrapper.value());
            rounds.insert(wrapper.device().clone(), wrapper.round());
        }

        self.phase = RunnerPhase::Done;
        info!(scenario = %self.scenario.name(), session = %session, "scenario done");
        Ok(RunReport {
            session,
            values,
            rounds,
        })
    }

    /// Signals every loop to stop, tears down the visualizer, joins every
    /// loop, and waits for full quiescence.
    fn drain(&mut self) {
        self.phase = RunnerPhase::Draining;

        for wrapper in self.scenario.processes() {
            wrapper.signal_stop();
        }
        if let Some(vis) = self.visualizer.as_mut() {
            vis.stop();
            vis.destroy();
        }
        for wrapper in self.scenario.processes() {
            wrapper.shutdown();
        }

        // shutdown() joins, but a loop may still be settling its status.
        let poll_interval = self.scenario.poll_interval();
        while !self.scenario.all_quiescent() {
            thread::sleep(poll_interval);
        }
    }

    /// The scenario, for reading final state after `run` returns.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}
