//! In-memory audit logger.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audit::{AuditEvent, AuditEventType, AuditLogger};

/// One entry in an [`InMemoryAuditLog`] trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    ExitView,
    Event(AuditEvent),
}

#[derive(Debug, Default)]
struct State {
    records: Vec<AuditRecord>,
    change_reason_required: bool,
    change_reason_given: bool,
    changes_made: bool,
    editing: bool,
}

/// Thread-safe [`AuditLogger`] that keeps the whole trail in memory.
///
/// Clones share the same trail, so a clone can be handed to the coordinator
/// while the original is used to inspect what was recorded.
///
/// Once a `CHANGE_REASON` event has been recorded the log stops reporting a
/// change reason as required.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<Mutex<State>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_change_reason_required(&self, required: bool) {
        self.lock().change_reason_required = required;
    }

    pub fn set_changes_made(&self, changes_made: bool) {
        self.lock().changes_made = changes_made;
    }

    pub fn set_editing(&self, editing: bool) {
        self.lock().editing = editing;
    }

    /// Every record in the order it was received.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().records.clone()
    }

    /// Only the events, without `exit_view` markers.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock()
            .records
            .iter()
            .filter_map(|record| match record {
                AuditRecord::Event(event) => Some(event.clone()),
                AuditRecord::ExitView => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditLogger for InMemoryAuditLog {
    fn is_change_reason_required(&self) -> bool {
        let state = self.lock();
        state.change_reason_required && !state.change_reason_given
    }

    fn has_changes(&self) -> bool {
        self.lock().changes_made
    }

    fn is_editing(&self) -> bool {
        self.lock().editing
    }

    fn exit_view(&self) {
        self.lock().records.push(AuditRecord::ExitView);
    }

    fn log_event(&self, event: AuditEvent) {
        let mut state = self.lock();
        if event.event_type == AuditEventType::ChangeReason {
            state.change_reason_given = true;
        }
        state.records.push(AuditRecord::Event(event));
    }
}
