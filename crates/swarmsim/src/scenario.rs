//! # Scenario description
//!
//! A [`Scenario`] is the immutable description of one simulation: a named
//! set of process wrappers, the physical and logical links between them,
//! an optional termination condition, and the orchestration tunables.
//! Built once via [`ScenarioBuilder`], owned by a runner for the duration
//! of a single run, and discarded afterwards. The process map is populated
//! at build time and never mutated during a run.

use std::collections::HashMap;
use std::time::Duration;

use swarmsim_types::DeviceId;
use tracing::warn;

use crate::process::ProcessWrapper;
use crate::termination::{ScenarioSnapshot, TerminationCondition};

/// Default sleep between termination-condition polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default base of the per-process port range.
pub const DEFAULT_BASE_PORT: u16 = 40_000;

/// Which network a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Physical,
    Logical,
}

/// An undirected link between two devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub a: DeviceId,
    pub b: DeviceId,
    pub kind: LinkKind,
}

impl Link {
    pub fn physical(a: DeviceId, b: DeviceId) -> Self {
        Self {
            a,
            b,
            kind: LinkKind::Physical,
        }
    }

    pub fn logical(a: DeviceId, b: DeviceId) -> Self {
        Self {
            a,
            b,
            kind: LinkKind::Logical,
        }
    }
}

/// Builder for [`Scenario`].
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    name: String,
    processes: HashMap<DeviceId, ProcessWrapper>,
    links: Vec<Link>,
    termination: Option<Box<dyn TerminationCondition>>,
    visualize: bool,
    poll_interval: Option<Duration>,
    base_port: Option<u16>,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a process wrapper, keyed by its device identifier.
    pub fn with_process(mut self, wrapper: ProcessWrapper) -> Self {
        self.processes.insert(wrapper.device().clone(), wrapper);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_termination(mut self, condition: Box<dyn TerminationCondition>) -> Self {
        self.termination = Some(condition);
        self
    }

    pub fn with_visualize(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Base of the port range processes are allocated from, in device
    /// order; process `i` gets `base + i`.
    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = Some(base_port);
        self
    }

    /// Finalizes the scenario, deriving each process's neighbor sets from
    /// the link set. Links naming an unknown device are skipped with a
    /// warning.
    pub fn build(mut self) -> Scenario {
        let mut physical: HashMap<DeviceId, Vec<DeviceId>> = HashMap::new();
        let mut logical: HashMap<DeviceId, Vec<DeviceId>> = HashMap::new();

        for link in &self.links {
            if !self.processes.contains_key(&link.a) || !self.processes.contains_key(&link.b) {
                warn!(a = %link.a, b = %link.b, "link names an unknown device, skipped");
                continue;
            }
            let map = match link.kind {
                LinkKind::Physical => &mut physical,
                LinkKind::Logical => &mut logical,
            };
            for (from, to) in [(&link.a, &link.b), (&link.b, &link.a)] {
                let neighbors = map.entry(from.clone()).or_default();
                if !neighbors.contains(to) {
                    neighbors.push(to.clone());
                }
            }
        }

        for (device, wrapper) in &mut self.processes {
            wrapper.set_neighbors(
                physical.remove(device).unwrap_or_default(),
                logical.remove(device).unwrap_or_default(),
            );
        }

        Scenario {
            name: self.name,
            processes: self.processes,
            links: self.links,
            termination: self.termination,
            visualize: self.visualize,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            base_port: self.base_port.unwrap_or(DEFAULT_BASE_PORT),
        }
    }
}

/// Immutable description of one simulation run.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    processes: HashMap<DeviceId, ProcessWrapper>,
    links: Vec<Link>,
    termination: Option<Box<dyn TerminationCondition>>,
    visualize: bool,
    poll_interval: Duration,
    base_port: u16,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process(&self, device: &DeviceId) -> Option<&ProcessWrapper> {
        self.processes.get(device)
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessWrapper> {
        self.processes.values()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn termination(&self) -> Option<&dyn TerminationCondition> {
        self.termination.as_deref()
    }

    pub fn visualize(&self) -> bool {
        self.visualize
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// One coherent observation of every process.
    pub fn snapshot(&self) -> ScenarioSnapshot {
        ScenarioSnapshot {
            observations: self.processes.values().map(|w| w.observation()).collect(),
        }
    }

    /// True once every process's execution loop has fully stopped.
    pub fn all_quiescent(&self) -> bool {
        self.processes.values().all(|w| w.is_quiescent())
    }
}
