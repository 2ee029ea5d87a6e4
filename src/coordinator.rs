//! The single-flight save coordinator.
//!
//! Internally the coordinator is a small phase machine:
//!
//! ```text
//!            save_form (gate applies)          save_reason (valid)
//!   Idle ───────────────────────────▶ AwaitingReason ─────────────┐
//!    │ ▲                                                          │
//!    │ └──────────── backend completes ◀── Saving ◀───────────────┘
//!    └─────────────── save_form (no gate) ───▲
//! ```
//!
//! Observers only ever see the [`SaveState`] projection of it: a parked
//! request shows up as `SAVING` (or `CHANGE_REASON_REQUIRED` when the
//! builder asks for the gate to be announced).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;

use crate::audit::{AuditEvent, AuditEventType, AuditLogger};
use crate::backend::PersistenceBackend;
use crate::clock::Clock;
use crate::request::{Locator, SaveRequest, valid_reason};
use crate::result::{self, ResultPublisher, SaveResult, SaveResultStream, SaveState};
use crate::worker::{self, AuditStep};

enum Phase {
    Idle,
    AwaitingReason {
        request: SaveRequest,
        publisher: ResultPublisher,
    },
    Saving {
        locator: Locator,
    },
}

struct CoordinatorState {
    phase: Phase,
    reason: String,
    last_save: Option<SaveResultStream>,
}

/// State shared between the coordinator and its in-flight save task.
pub(crate) struct Shared<B, L> {
    pub(crate) backend: B,
    audit: L,
    clock: Box<dyn Clock>,
    announce_change_reason: bool,
    state: Mutex<CoordinatorState>,
}

impl<B: PersistenceBackend, L: AuditLogger> Shared<B, L> {
    pub(crate) fn new(
        backend: B,
        audit: L,
        clock: Box<dyn Clock>,
        announce_change_reason: bool,
    ) -> Self {
        Self {
            backend,
            audit,
            clock,
            announce_change_reason,
            state: Mutex::new(CoordinatorState {
                phase: Phase::Idle,
                reason: String::new(),
                last_save: None,
            }),
        }
    }

    // Every transition leaves the state consistent, so a panic elsewhere
    // while the lock was held does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Complete the in-flight save.
    ///
    /// The audit trail is recorded and the coordinator returns to idle before
    /// `result` is pushed, so anyone reacting to the push sees the full trail
    /// and may start a new save straight away.
    pub(crate) fn finish(
        &self,
        trail: &[AuditStep],
        result: SaveResult,
        publisher: ResultPublisher,
    ) {
        let mut state = self.lock();
        for step in trail {
            match *step {
                AuditStep::ExitView => self.audit.exit_view(),
                AuditStep::Event(event_type, exiting) => {
                    self.audit
                        .log_event(AuditEvent::new(event_type, exiting, self.clock.now()));
                }
            }
        }
        state.phase = Phase::Idle;
        publisher.publish(result);
    }

    fn reason_gate_applies(&self) -> bool {
        self.audit.is_change_reason_required()
            && self.audit.has_changes()
            && self.audit.is_editing()
    }
}

/// Coordinates saving a form submission.
///
/// At most one save is in flight at a time. A save requested while another
/// is outstanding is rejected with `ALREADY_SAVING` and starts no work.
/// When the audit policy requires a change reason, the save is parked until
/// [`save_reason`](Self::save_reason) accepts one.
///
/// Built with [`SaveCoordinatorBuilder`](crate::SaveCoordinatorBuilder).
/// All methods are synchronous and never wait for the backend.
pub struct SaveCoordinator<B, L> {
    shared: Arc<Shared<B, L>>,
    runtime: Handle,
}

impl<B: PersistenceBackend, L: AuditLogger> SaveCoordinator<B, L> {
    pub(crate) fn new(shared: Shared<B, L>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(shared),
            runtime,
        }
    }

    /// Request a save of the form instance at `locator`.
    ///
    /// Always returns a fresh stream. See [`submit`](Self::submit).
    pub fn save_form(
        &self,
        locator: impl Into<Locator>,
        should_finalize: bool,
        reason: impl Into<String>,
        is_exiting: bool,
    ) -> SaveResultStream {
        self.submit(SaveRequest::new(locator, should_finalize, reason, is_exiting))
    }

    /// Request a save described by `request`.
    ///
    /// The returned stream starts in `SAVING` and ends in the state the
    /// backend's result code maps to. If a save is already in progress it
    /// instead holds `ALREADY_SAVING` and never changes.
    pub fn submit(&self, request: SaveRequest) -> SaveResultStream {
        let mut state = self.shared.lock();

        if !matches!(state.phase, Phase::Idle) {
            tracing::debug!(
                "Save of {} rejected, another save is in progress",
                request.locator()
            );
            return SaveResultStream::settled_with(SaveResult::new(SaveState::AlreadySaving));
        }

        if self.shared.reason_gate_applies() {
            let initial = if self.shared.announce_change_reason {
                SaveState::ChangeReasonRequired
            } else {
                SaveState::Saving
            };
            let (publisher, stream) = result::channel(SaveResult::new(initial));
            tracing::debug!("Save of {} is waiting for a change reason", request.locator());
            state.phase = Phase::AwaitingReason { request, publisher };
            state.last_save = Some(stream.clone());
            return stream;
        }

        let (publisher, stream) = result::channel(SaveResult::new(SaveState::Saving));
        state.last_save = Some(stream.clone());
        self.dispatch(&mut state, request, publisher);
        stream
    }

    /// Buffer a change reason for a later [`save_reason`](Self::save_reason).
    pub fn set_reason(&self, reason: impl Into<String>) {
        self.shared.lock().reason = reason.into();
    }

    /// The buffered change reason, as last set.
    pub fn reason(&self) -> String {
        self.shared.lock().reason.clone()
    }

    /// Accept the buffered change reason.
    ///
    /// Returns `false`, logging nothing, if the reason is blank. Otherwise
    /// logs a `CHANGE_REASON` audit event with the trimmed reason, clears the
    /// buffer, resumes any save that was waiting for it, and returns `true`.
    pub fn save_reason(&self) -> bool {
        let mut state = self.shared.lock();

        let Some(reason) = valid_reason(&state.reason) else {
            tracing::debug!("Blank change reason rejected");
            return false;
        };
        self.shared.audit.log_event(AuditEvent::with_reason(
            AuditEventType::ChangeReason,
            true,
            self.shared.clock.now(),
            reason,
        ));
        state.reason.clear();

        match std::mem::replace(&mut state.phase, Phase::Idle) {
            Phase::AwaitingReason { request, publisher } => {
                tracing::debug!("Change reason accepted, resuming save of {}", request.locator());
                publisher.advance(SaveState::Saving);
                self.dispatch(&mut state, request, publisher);
            }
            phase => state.phase = phase,
        }
        true
    }

    /// Returns `true` while a save is waiting for a reason or running.
    pub fn is_saving(&self) -> bool {
        !matches!(self.shared.lock().phase, Phase::Idle)
    }

    /// Stream of the in-flight save, or of the last one started.
    ///
    /// Rejected (`ALREADY_SAVING`) requests never replace it.
    pub fn last_save(&self) -> Option<SaveResultStream> {
        self.shared.lock().last_save.clone()
    }

    fn dispatch(
        &self,
        state: &mut CoordinatorState,
        request: SaveRequest,
        publisher: ResultPublisher,
    ) {
        tracing::debug!("Dispatching save of {}", request.locator());
        state.phase = Phase::Saving {
            locator: request.locator().clone(),
        };
        self.runtime
            .spawn(worker::run(Arc::clone(&self.shared), request, publisher));
    }
}

impl<B, L> Drop for SaveCoordinator<B, L> {
    fn drop(&mut self) {
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Phase::Saving { locator } = &state.phase {
            tracing::debug!("Coordinator dropped while saving {locator}, save will still complete");
        }
    }
}
