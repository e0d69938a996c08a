//! # swarmsim-types: Core types for the swarmsim testbed
//!
//! This crate contains shared types used across the swarmsim system:
//! - Device identity ([`DeviceId`])
//! - Program values ([`Value`]), including the ordered-tuple shape
//! - Message history entries ([`Message`], [`Direction`])
//! - Process lifecycle states ([`ProcessStatus`])
//! - Run-scoped session binding ([`SessionToken`])

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ============================================================================
// Device Identity
// ============================================================================

/// Identity of one simulated node process within a scenario.
///
/// Three backing shapes are supported; all satisfy the same
/// equality/hash/render contract and none is privileged. A scenario may
/// freely mix shapes, though in practice a parser picks one per network
/// description.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceId {
    /// Integer-backed identifier.
    Int(i32),
    /// Long-integer-backed identifier.
    Long(i64),
    /// String-backed identifier.
    Named(String),
}

impl DeviceId {
    /// Creates an integer-backed identifier.
    pub fn int(id: i32) -> Self {
        Self::Int(id)
    }

    /// Creates a long-integer-backed identifier.
    pub fn long(id: i64) -> Self {
        Self::Long(id)
    }

    /// Creates a string-backed identifier.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Int(id) => write!(f, "{id}"),
            DeviceId::Long(id) => write!(f, "{id}"),
            DeviceId::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<i32> for DeviceId {
    fn from(id: i32) -> Self {
        Self::Int(id)
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self::Long(id)
    }
}

impl From<&str> for DeviceId {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

// ============================================================================
// Session Token
// ============================================================================

/// Opaque token identifying one run of a scenario.
///
/// A fresh token is generated per run and stamped into every process before
/// its execution loop starts. Attacks are bound to a token, so an attack
/// computed for one run never fires in a later run that reuses the same
/// device identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Creates a token from a raw value (deterministic, for tests).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value produced or consumed by a node's program.
///
/// `List` is the raw flat-sequence shape as it appears in external input;
/// `Tuple` is the ordered-tuple shape the testbed works with internally.
/// Environment bootstrap converts lists to tuples on insertion, and the
/// result oracle accepts an expected `List` as structurally equal to an
/// actual `Tuple` of the same elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value. Matches only itself.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value. Compared and hashed by bit pattern.
    Float(f64),
    /// String value.
    Str(String),
    /// Flat sequence as found in external input.
    List(Vec<Value>),
    /// Ordered tuple, the internal sequence shape.
    Tuple(Vec<Value>),
}

impl Value {
    /// Creates a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Creates a list value.
    pub fn list(items: impl Into<Vec<Value>>) -> Self {
        Self::List(items.into())
    }

    /// Creates a tuple value.
    pub fn tuple(items: impl Into<Vec<Value>>) -> Self {
        Self::Tuple(items.into())
    }

    /// Returns true if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// Floats compare by bit pattern so that Eq and Hash agree.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) | Value::Tuple(items) => items.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Direction of a message relative to the owning process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Received from the network.
    Incoming,
    /// Produced by the local program.
    Outgoing,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// One immutable entry in a process's message history.
///
/// Equality and hashing cover both fields. The position of a message within
/// a log is the append order and is significant; the message itself carries
/// no sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Direction relative to the owning process.
    pub direction: Direction,
    /// The carried value.
    pub payload: Value,
}

impl Message {
    /// Creates a message with the given direction and payload.
    pub fn new(direction: Direction, payload: Value) -> Self {
        Self { direction, payload }
    }

    /// Creates an incoming message.
    pub fn incoming(payload: Value) -> Self {
        Self::new(Direction::Incoming, payload)
    }

    /// Creates an outgoing message.
    pub fn outgoing(payload: Value) -> Self {
        Self::new(Direction::Outgoing, payload)
    }
}

// ============================================================================
// Process Status
// ============================================================================

/// Lifecycle state of one simulated process.
///
/// Transitions: `Init → Run → {Hung, Stop}`; a `Shutdown`-commanded process
/// ends in `Stop` as well. Status never moves backwards: no process re-enters
/// `Run` after reaching `Stop`. `Hung` is momentary — it is observable at
/// most once before collapsing to `Stop` on the next status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Constructed, execution loop not started.
    Init,
    /// Execution loop actively running rounds.
    Run,
    /// Execution loop detected as non-responsive; collapses to `Stop`.
    Hung,
    /// Execution loop has exited; no further rounds.
    Stop,
    /// Externally commanded to terminate; becomes `Stop` once the loop exits.
    Shutdown,
}

impl ProcessStatus {
    /// Returns true if the execution loop has fully stopped.
    pub fn is_quiescent(&self) -> bool {
        matches!(self, ProcessStatus::Stop)
    }
}

impl Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Init => write!(f, "init"),
            ProcessStatus::Run => write!(f, "run"),
            ProcessStatus::Hung => write!(f, "hung"),
            ProcessStatus::Stop => write!(f, "stop"),
            ProcessStatus::Shutdown => write!(f, "shutdown"),
        }
    }
}
