//! Audit trail collaborators.
//!
//! The coordinator reports what happened to a form instance through an
//! [`AuditLogger`]: timestamped [`AuditEvent`]s plus an "exit view" side
//! effect. The same logger answers the policy questions that decide whether
//! a change reason is needed before saving.
//!
//! [`InMemoryAuditLog`] is a ready-made logger that keeps the trail in memory.

mod memory;

pub use memory::{AuditRecord, InMemoryAuditLog};

use std::fmt;

use chrono::{DateTime, Utc};

/// Kinds of audit events emitted by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AuditEventType {
    ChangeReason,
    FormSave,
    FormExit,
    FormFinalize,
    SaveError,
    FinalizeError,
    ConstraintError,
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditEventType::ChangeReason => "CHANGE_REASON",
            AuditEventType::FormSave => "FORM_SAVE",
            AuditEventType::FormExit => "FORM_EXIT",
            AuditEventType::FormFinalize => "FORM_FINALIZE",
            AuditEventType::SaveError => "SAVE_ERROR",
            AuditEventType::FinalizeError => "FINALIZE_ERROR",
            AuditEventType::ConstraintError => "CONSTRAINT_ERROR",
        };
        f.write_str(name)
    }
}

/// An immutable, timestamped record of something that happened to a form
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    /// For `FORM_EXIT` this is set when the form was left unfinalized.
    pub exiting: bool,
    pub timestamp: DateTime<Utc>,
    /// Only present on `CHANGE_REASON` events.
    pub change_reason: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, exiting: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            exiting,
            timestamp,
            change_reason: None,
        }
    }

    pub fn with_reason(
        event_type: AuditEventType,
        exiting: bool,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            change_reason: Some(reason.into()),
            ..Self::new(event_type, exiting, timestamp)
        }
    }
}

/// Sink for audit events and source of the change-reason policy.
///
/// Calls arrive from the caller's thread and from the task that completes a
/// save, so implementations must be `Send + Sync`. Events must be recorded
/// in the order they are received.
pub trait AuditLogger: Send + Sync + 'static {
    /// Whether edits to this instance must be justified with a reason.
    fn is_change_reason_required(&self) -> bool;

    /// Whether there are unsaved changes.
    fn has_changes(&self) -> bool;

    /// Whether the session is editing a previously saved instance.
    fn is_editing(&self) -> bool;

    /// Record that the current view was left.
    fn exit_view(&self);

    /// Append an event to the trail.
    fn log_event(&self, event: AuditEvent);
}
