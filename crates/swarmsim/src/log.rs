//! # Message log with forensic rewind
//!
//! Each process keeps an append-only log of the messages it has sent and
//! received, newest last. When a process is flagged compromised or its
//! latest state contaminated, the orchestrating wrapper rewinds the log one
//! step at a time until the flags clear or the log runs out of history.
//! Exhaustion with the flags still raised is a normal outcome, not a
//! failure: the process simply remains flagged unsafe.
//!
//! The log owns no interpretation of compromise or contamination. It only
//! asks the supplied [`SafetyProbe`] and truncates; re-deriving process
//! state from the surviving history is the caller's job.

use swarmsim_types::Message;
use tracing::debug;

use crate::error::RewindError;

/// Unsafe-state predicates supplied by the concrete process type.
///
/// Both predicates are re-polled before every discarded step, so a probe
/// that re-derives state as history shrinks can stop the rewind early.
pub trait SafetyProbe {
    /// True while the process is considered compromised.
    fn is_compromised(&self) -> bool;

    /// True while the process's most recent state is considered
    /// contaminated.
    fn is_contaminated(&self) -> bool;
}

/// Append-only message history, newest last. Never reorders, never
/// deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message as the new head of history.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The newest message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no history is retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The full retained history, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Discards the newest message, returning it.
    pub fn rewind_one_step(&mut self) -> Result<Message, RewindError> {
        self.messages.pop().ok_or(RewindError::Exhausted)
    }

    /// Rewinds while `probe` reports the process unsafe and history
    /// remains, returning how many messages were discarded.
    ///
    /// Idempotent: with no intervening append, a second call discards
    /// nothing, because the probe already reports safe or the log is
    /// already empty.
    pub fn rewind_until_safe(&mut self, probe: &dyn SafetyProbe) -> usize {
        let mut discarded = 0;
        while probe.is_compromised() || probe.is_contaminated() {
            if self.messages.pop().is_none() {
                break;
            }
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, retained = self.messages.len(), "log rewound");
        }
        discarded
    }
}
