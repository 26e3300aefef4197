//! Ordered log of emitted [`SystemEvent`]s.

use epochcore_types::SystemEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Append-only event sink shared by the core components.
///
/// Consumers drain it after each call; the runtime drops whatever a failed
/// call emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SystemEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn emit(&mut self, event: SystemEvent) {
        debug!(event = event.name(), "Event emitted");
        self.events.push(event);
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[SystemEvent] {
        &self.events
    }

    /// Removes and returns all events.
    pub fn drain(&mut self) -> Vec<SystemEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drops everything emitted after the first `len` events.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
