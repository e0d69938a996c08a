//! # Process wrapper lifecycle state machine
//!
//! A [`ProcessWrapper`] owns one simulated node: its status, round and
//! execution counters, current value, and its message log. `initialize`
//! spawns a dedicated execution thread that repeatedly steps the external
//! engine, applies the active attacks for the round, rewinds unsafe
//! history, publishes the round result, and sleeps the inter-round
//! interval.
//!
//! Cancellation is cooperative: the loop checks a stop flag at round
//! boundaries only, so a single engine step is never interrupted
//! mid-flight. An engine error inside a round is contained to that
//! process: the wrapper logs it, hangs the loop, and the rest of the
//! scenario keeps running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use swarmsim_attack::{AttackModel, AttackTarget};
use swarmsim_engine::{Environment, StepEngine};
use swarmsim_types::{DeviceId, Message, ProcessStatus, SessionToken, Value};
use tracing::{info, warn};

use crate::error::SimError;
use crate::log::{MessageLog, SafetyProbe};
use crate::termination::ProcessObservation;

/// Default sleep between rounds.
pub const DEFAULT_ROUND_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for one process's execution loop.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Sleep between rounds. A latency/CPU tradeoff, not a correctness
    /// parameter.
    pub round_interval: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            round_interval: DEFAULT_ROUND_INTERVAL,
        }
    }
}

impl ProcessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_round_interval(mut self, interval: Duration) -> Self {
        self.round_interval = interval;
        self
    }
}

/// Per-process context handed to `initialize` by the runner.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Session token of the current run.
    pub session: SessionToken,
    /// Attack model consulted every round.
    pub attacks: Arc<dyn AttackModel>,
    /// Port allocated to this process from the scenario's base port.
    pub port: u16,
}

// ============================================================================
// Shared state
// ============================================================================

/// Round counter, execution counter, and current value, published together
/// so readers never observe a round paired with a stale value.
#[derive(Debug, Clone, Default)]
struct RoundState {
    round: u64,
    executions: u64,
    value: Value,
}

#[derive(Debug)]
struct ProcessShared {
    device: DeviceId,
    status: Mutex<ProcessStatus>,
    round_state: RwLock<RoundState>,
    stop: AtomicBool,
    compromised: AtomicBool,
    contaminated: AtomicBool,
}

/// The per-round view handed to attacks and to the rewind engine.
struct RoundTarget<'a> {
    shared: &'a ProcessShared,
    session: SessionToken,
}

impl AttackTarget for RoundTarget<'_> {
    fn device_id(&self) -> &DeviceId {
        &self.shared.device
    }

    fn session(&self) -> SessionToken {
        self.session
    }

    fn mark_compromised(&self) {
        self.shared.compromised.store(true, Ordering::SeqCst);
    }

    fn mark_contaminated(&self) {
        self.shared.contaminated.store(true, Ordering::SeqCst);
    }
}

impl SafetyProbe for RoundTarget<'_> {
    fn is_compromised(&self) -> bool {
        self.shared.compromised.load(Ordering::SeqCst)
    }

    fn is_contaminated(&self) -> bool {
        self.shared.contaminated.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Execution loop
// ============================================================================

struct ExecutionLoop {
    shared: Arc<ProcessShared>,
    log: Arc<Mutex<MessageLog>>,
    engine: Box<dyn StepEngine>,
    environment: Environment,
    attacks: Arc<dyn AttackModel>,
    session: SessionToken,
    interval: Duration,
}

impl ExecutionLoop {
    fn run(mut self) {
        info!(device = %self.shared.device, session = %self.session, "execution loop started");

        while !self.shared.stop.load(Ordering::SeqCst) {
            // Last round's attack flags no longer apply.
            self.shared.compromised.store(false, Ordering::SeqCst);
            self.shared.contaminated.store(false, Ordering::SeqCst);

            let env = std::mem::take(&mut self.environment);
            let value = match self.engine.step(env) {
                Ok((value, next_env)) => {
                    self.environment = next_env;
                    value
                }
                Err(err) => {
                    warn!(
                        device = %self.shared.device,
                        error = %err,
                        "round failed, treating process as hung"
                    );
                    let Ok(mut status) = self.shared.status.lock() else {
                        return;
                    };
                    *status = ProcessStatus::Hung;
                    return;
                }
            };

            if let Ok(mut log) = self.log.lock() {
                log.append(Message::outgoing(value.clone()));
            }

            let target = RoundTarget {
                shared: &self.shared,
                session: self.session,
            };
            for attack in self.attacks.attacks_for(&self.shared.device, self.session) {
                attack.apply(&target);
            }

            if target.is_compromised() || target.is_contaminated() {
                if let Ok(mut log) = self.log.lock() {
                    let discarded = log.rewind_until_safe(&target);
                    warn!(
                        device = %self.shared.device,
                        discarded,
                        "unsafe round, message history rewound"
                    );
                }
            }

            if let Ok(mut state) = self.shared.round_state.write() {
                state.round += 1;
                state.executions += 1;
                state.value = value;
            }

            thread::sleep(self.interval);
        }

        let Ok(mut status) = self.shared.status.lock() else {
            return;
        };
        if *status == ProcessStatus::Run {
            *status = ProcessStatus::Stop;
        }
        info!(device = %self.shared.device, "execution loop stopped");
    }
}

// ============================================================================
// Process wrapper
// ============================================================================

/// Lifecycle and state owner for one simulated node.
pub struct ProcessWrapper {
    shared: Arc<ProcessShared>,
    log: Arc<Mutex<MessageLog>>,
    // Engine and starting environment, consumed by `initialize`.
    boot: Mutex<Option<(Box<dyn StepEngine>, Environment)>>,
    config: ProcessConfig,
    physical_neighbors: Vec<DeviceId>,
    logical_neighbors: Vec<DeviceId>,
    port: Mutex<Option<u16>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessWrapper {
    /// Creates a wrapper in the `Init` state around an engine and its
    /// starting environment.
    pub fn new(device: DeviceId, engine: Box<dyn StepEngine>, environment: Environment) -> Self {
        Self {
            shared: Arc::new(ProcessShared {
                device,
                status: Mutex::new(ProcessStatus::Init),
                round_state: RwLock::new(RoundState::default()),
                stop: AtomicBool::new(false),
                compromised: AtomicBool::new(false),
                contaminated: AtomicBool::new(false),
            }),
            log: Arc::new(Mutex::new(MessageLog::new())),
            boot: Mutex::new(Some((engine, environment))),
            config: ProcessConfig::default(),
            physical_neighbors: Vec::new(),
            logical_neighbors: Vec::new(),
            port: Mutex::new(None),
            thread: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: ProcessConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn set_neighbors(&mut self, physical: Vec<DeviceId>, logical: Vec<DeviceId>) {
        self.physical_neighbors = physical;
        self.logical_neighbors = logical;
    }

    /// Transitions `Init -> Run` and spawns the execution thread.
    ///
    /// Fails fast with no partial side effects when called twice.
    pub fn initialize(&self, ctx: &ScenarioContext) -> Result<(), SimError> {
        let Ok(mut status) = self.shared.status.lock() else {
            return Err(SimError::InvalidPhase {
                phase: "status lock poisoned",
            });
        };
        if *status != ProcessStatus::Init {
            return Err(SimError::AlreadyStarted {
                device: self.shared.device.clone(),
            });
        }

        let Ok(mut boot) = self.boot.lock() else {
            return Err(SimError::InvalidPhase {
                phase: "boot lock poisoned",
            });
        };
        let Some((engine, environment)) = boot.take() else {
            return Err(SimError::AlreadyStarted {
                device: self.shared.device.clone(),
            });
        };

        let exec = ExecutionLoop {
            shared: Arc::clone(&self.shared),
            log: Arc::clone(&self.log),
            engine,
            environment,
            attacks: Arc::clone(&ctx.attacks),
            session: ctx.session,
            interval: self.config.round_interval,
        };
        let spawned = thread::Builder::new()
            .name(format!("swarm-node-{}", self.shared.device))
            .spawn(move || exec.run());
        let handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                // The engine was consumed by the closure that never ran;
                // the process can only read as stopped from here on.
                *status = ProcessStatus::Stop;
                return Err(SimError::SpawnFailed {
                    device: self.shared.device.clone(),
                    source,
                });
            }
        };

        if let Ok(mut port) = self.port.lock() {
            *port = Some(ctx.port);
        }
        if let Ok(mut thread_slot) = self.thread.lock() {
            *thread_slot = Some(handle);
        }
        *status = ProcessStatus::Run;
        info!(device = %self.shared.device, port = ctx.port, "process initialized");
        Ok(())
    }

    /// Observes the loop's liveness. A halted or hung loop reads as
    /// `Stop`; `Hung` itself is observable exactly once. A thread that
    /// died without writing a terminal status (a panicking engine, for
    /// example) is detected here and collapsed the same way.
    pub fn status(&self) -> ProcessStatus {
        let Ok(mut status) = self.shared.status.lock() else {
            return ProcessStatus::Stop;
        };
        match *status {
            ProcessStatus::Hung => {
                *status = ProcessStatus::Stop;
                ProcessStatus::Hung
            }
            ProcessStatus::Run if self.loop_finished() => {
                *status = ProcessStatus::Stop;
                ProcessStatus::Hung
            }
            other => other,
        }
    }

    // The loop writes its terminal status before exiting; a finished
    // thread still marked `Run` died mid-round.
    fn loop_finished(&self) -> bool {
        match self.thread.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|handle| handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Raises the stop flag without blocking; the loop observes it at the
    /// next round boundary.
    pub fn signal_stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    /// Signals the loop to halt, blocks until it has, then settles on
    /// `Stop`. Idempotent.
    pub fn shutdown(&self) {
        {
            let Ok(mut status) = self.shared.status.lock() else {
                return;
            };
            if !status.is_quiescent() {
                *status = ProcessStatus::Shutdown;
            }
        }
        self.shared.stop.store(true, Ordering::SeqCst);

        let handle = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(device = %self.shared.device, "execution thread panicked during shutdown");
            }
        }

        let Ok(mut status) = self.shared.status.lock() else {
            return;
        };
        *status = ProcessStatus::Stop;
    }

    /// True once the execution loop has fully stopped.
    pub fn is_quiescent(&self) -> bool {
        self.status().is_quiescent()
    }

    pub fn device(&self) -> &DeviceId {
        &self.shared.device
    }

    /// Latest completed round counter.
    pub fn round(&self) -> u64 {
        match self.shared.round_state.read() {
            Ok(state) => state.round,
            Err(_) => 0,
        }
    }

    /// Total engine steps performed.
    pub fn executions(&self) -> u64 {
        match self.shared.round_state.read() {
            Ok(state) => state.executions,
            Err(_) => 0,
        }
    }

    /// Value produced by the latest completed round.
    pub fn value(&self) -> Value {
        match self.shared.round_state.read() {
            Ok(state) => state.value.clone(),
            Err(_) => Value::Null,
        }
    }

    /// May legitimately be empty before the first round completes.
    pub fn physical_neighbors(&self) -> &[DeviceId] {
        &self.physical_neighbors
    }

    pub fn logical_neighbors(&self) -> &[DeviceId] {
        &self.logical_neighbors
    }

    /// Port allocated at initialize time.
    pub fn port(&self) -> Option<u16> {
        match self.port.lock() {
            Ok(port) => *port,
            Err(_) => None,
        }
    }

    /// True while the current round is flagged compromised.
    pub fn is_compromised(&self) -> bool {
        self.shared.compromised.load(Ordering::SeqCst)
    }

    /// True while the latest state is flagged contaminated.
    pub fn is_contaminated(&self) -> bool {
        self.shared.contaminated.load(Ordering::SeqCst)
    }

    /// Snapshot of the retained message history, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        match self.log.lock() {
            Ok(log) => log.messages().to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// One coherent observation for termination checks.
    pub fn observation(&self) -> ProcessObservation {
        let (round, executions, value) = match self.shared.round_state.read() {
            Ok(state) => (state.round, state.executions, state.value.clone()),
            Err(_) => (0, 0, Value::Null),
        };
        ProcessObservation {
            device: self.shared.device.clone(),
            status: self.status(),
            round,
            executions,
            value,
        }
    }
}

impl Drop for ProcessWrapper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ProcessWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessWrapper")
            .field("device", &self.shared.device)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use swarmsim_attack::{AttackEffect, NoAttackModel, TargetedAttackModel};
    use swarmsim_engine::{EngineError, FixedStepEngine};

    use super::*;

    fn context() -> ScenarioContext {
        ScenarioContext {
            session: SessionToken::generate(),
            attacks: Arc::new(NoAttackModel),
            port: 42_000,
        }
    }

    fn fast_wrapper(device: DeviceId, engine: Box<dyn StepEngine>) -> ProcessWrapper {
        ProcessWrapper::new(device, engine, Environment::new())
            .with_config(ProcessConfig::new().with_round_interval(Duration::from_millis(1)))
    }

    fn wait_until(deadline_ms: u64, mut check: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_millis(deadline_ms);
        while std::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        check()
    }

    /// Engine returning a monotonically increasing integer.
    struct CountingEngine {
        count: i64,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self { count: 0 }
        }
    }

    impl StepEngine for CountingEngine {
        fn step(&mut self, env: Environment) -> Result<(Value, Environment), EngineError> {
            self.count += 1;
            Ok((Value::Int(self.count), env))
        }
    }

    /// Engine that panics instead of returning an error, killing the
    /// execution thread without a terminal status write.
    struct PanickingEngine;

    impl StepEngine for PanickingEngine {
        fn step(&mut self, _env: Environment) -> Result<(Value, Environment), EngineError> {
            panic!("engine blew up");
        }
    }

    /// Engine that fails after a fixed number of successful rounds.
    struct FailAfter {
        remaining: u64,
    }

    impl StepEngine for FailAfter {
        fn step(&mut self, env: Environment) -> Result<(Value, Environment), EngineError> {
            if self.remaining == 0 {
                return Err(EngineError::Evaluation {
                    reason: "induced failure".into(),
                });
            }
            self.remaining -= 1;
            Ok((Value::Int(1), env))
        }
    }

    #[test]
    fn double_initialize_fails_fast() {
        let wrapper = fast_wrapper(
            DeviceId::int(1),
            Box::new(FixedStepEngine::new(Value::Int(7))),
        );
        let ctx = context();

        wrapper.initialize(&ctx).unwrap();
        let second = wrapper.initialize(&ctx);
        assert!(matches!(second, Err(SimError::AlreadyStarted { .. })));

        wrapper.shutdown();
    }

    #[test]
    fn rounds_advance_and_value_tracks_round() {
        let wrapper = fast_wrapper(DeviceId::int(2), Box::new(CountingEngine::new()));
        wrapper.initialize(&context()).unwrap();

        assert!(wait_until(2_000, || wrapper.round() >= 3));
        wrapper.shutdown();

        // Round counter and value were published together.
        let obs = wrapper.observation();
        assert_eq!(obs.value, Value::Int(obs.round as i64));
        assert_eq!(obs.executions, obs.round);
        assert_eq!(obs.status, ProcessStatus::Stop);
    }

    #[test]
    fn engine_error_is_contained_as_a_hang() {
        let wrapper = fast_wrapper(DeviceId::named("flaky"), Box::new(FailAfter { remaining: 2 }));
        wrapper.initialize(&context()).unwrap();

        assert!(wait_until(2_000, || {
            matches!(
                wrapper.status(),
                ProcessStatus::Hung | ProcessStatus::Stop
            )
        }));
        // Hung is observable at most once, then settles on Stop.
        assert_eq!(wrapper.status(), ProcessStatus::Stop);
        assert_eq!(wrapper.round(), 2);
    }

    #[test]
    fn dead_loop_collapses_to_stop() {
        let wrapper = fast_wrapper(DeviceId::named("doomed"), Box::new(PanickingEngine));
        wrapper.initialize(&context()).unwrap();

        // The thread dies without a terminal status write; status() must
        // still detect the dead loop instead of reporting Run forever.
        assert!(wait_until(2_000, || {
            !matches!(wrapper.status(), ProcessStatus::Run)
        }));
        assert_eq!(wrapper.status(), ProcessStatus::Stop);
        assert!(wrapper.is_quiescent());
    }

    #[test]
    fn shutdown_is_idempotent_and_reaches_stop() {
        let wrapper = fast_wrapper(
            DeviceId::int(3),
            Box::new(FixedStepEngine::new(Value::Null)),
        );
        wrapper.initialize(&context()).unwrap();

        wrapper.shutdown();
        wrapper.shutdown();
        assert_eq!(wrapper.status(), ProcessStatus::Stop);
        assert!(wrapper.is_quiescent());
    }

    #[test]
    fn signal_stop_halts_at_a_round_boundary() {
        let wrapper = fast_wrapper(DeviceId::int(4), Box::new(CountingEngine::new()));
        wrapper.initialize(&context()).unwrap();

        assert!(wait_until(2_000, || wrapper.round() >= 1));
        wrapper.signal_stop();
        assert!(wait_until(2_000, || wrapper.is_quiescent()));
    }

    #[test]
    fn targeted_attack_rewinds_the_log() {
        let device = DeviceId::named("victim");
        let attacks = TargetedAttackModel::new()
            .with_target(device.clone(), AttackEffect::Contaminate);
        let ctx = ScenarioContext {
            session: SessionToken::generate(),
            attacks: Arc::new(attacks),
            port: 42_001,
        };

        let wrapper = fast_wrapper(device, Box::new(CountingEngine::new()));
        wrapper.initialize(&ctx).unwrap();

        assert!(wait_until(2_000, || wrapper.round() >= 3));
        wrapper.shutdown();

        // Every round was flagged, so each round's message was discarded.
        assert!(wrapper.messages().is_empty());
        assert!(wrapper.round() >= 3);
    }

    #[test]
    fn untargeted_process_keeps_its_history() {
        let attacks = TargetedAttackModel::new().compromise(DeviceId::named("someone-else"));
        let ctx = ScenarioContext {
            session: SessionToken::generate(),
            attacks: Arc::new(attacks),
            port: 42_002,
        };

        let wrapper = fast_wrapper(DeviceId::int(5), Box::new(CountingEngine::new()));
        wrapper.initialize(&ctx).unwrap();

        assert!(wait_until(2_000, || wrapper.round() >= 3));
        wrapper.shutdown();

        let messages = wrapper.messages();
        assert!(messages.len() >= 3);
        assert_eq!(messages[0], Message::outgoing(Value::Int(1)));
    }

    #[test]
    fn port_is_recorded_at_initialize() {
        let wrapper = fast_wrapper(
            DeviceId::int(6),
            Box::new(FixedStepEngine::new(Value::Null)),
        );
        assert_eq!(wrapper.port(), None);
        wrapper.initialize(&context()).unwrap();
        assert_eq!(wrapper.port(), Some(42_000));
        wrapper.shutdown();
    }
}
