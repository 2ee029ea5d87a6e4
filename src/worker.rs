//! Background task that runs one dispatched save to completion.
//!
//! This module is internal -- users interact with it indirectly through
//! [`SaveCoordinator`](crate::SaveCoordinator).

use std::sync::Arc;

use crate::audit::{AuditEventType, AuditLogger};
use crate::backend::{PersistenceBackend, SaveCode, SaveOutcome};
use crate::coordinator::Shared;
use crate::error::FormSaveError;
use crate::request::SaveRequest;
use crate::result::{ResultPublisher, SaveResult, SaveState};

/// One side effect recorded on the audit logger when a save completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuditStep {
    ExitView,
    /// Event type and its `exiting` flag.
    Event(AuditEventType, bool),
}

pub(crate) async fn run<B: PersistenceBackend, L: AuditLogger>(
    shared: Arc<Shared<B, L>>,
    request: SaveRequest,
    publisher: ResultPublisher,
) {
    let outcome = persist(&shared, &request).await;
    let result = translate(outcome);
    let trail = audit_trail(result.state(), &request);

    match result.state() {
        SaveState::Saved => tracing::info!("Saved {}", request.locator()),
        SaveState::ConstraintError => {
            tracing::warn!("Save of {} failed validation", request.locator());
        }
        state => tracing::error!(
            "Save of {} ended in {state}: {}",
            request.locator(),
            result.message().unwrap_or("no message")
        ),
    }

    shared.finish(&trail, result, publisher);
}

/// Run the backend on its own task so a panic surfaces as an outcome.
async fn persist<B: PersistenceBackend, L: AuditLogger>(
    shared: &Arc<Shared<B, L>>,
    request: &SaveRequest,
) -> SaveOutcome {
    let task_shared = Arc::clone(shared);
    let task_request = request.clone();
    let task = tokio::spawn(async move { task_shared.backend.save(&task_request).await });

    let saved = match task.await {
        Ok(saved) => saved,
        Err(e) => Err(FormSaveError::TaskAborted(e.to_string())),
    };
    saved.unwrap_or_else(|e| SaveOutcome::with_message(SaveCode::SaveError, e.to_string()))
}

/// Map a backend outcome to the outward result.
///
/// Only `SAVE_ERROR` and `FINALIZE_ERROR` carry the backend's message.
pub(crate) fn translate(outcome: SaveOutcome) -> SaveResult {
    match outcome.code() {
        SaveCode::AnswerConstraintViolated => SaveResult::new(SaveState::ConstraintError),
        SaveCode::AnswerRequiredButEmpty => SaveResult::new(SaveState::ConstraintError),
        SaveCode::EncryptionError => {
            SaveResult::with_message(SaveState::FinalizeError, outcome.into_message())
        }
        SaveCode::SaveError => SaveResult::with_message(SaveState::SaveError, outcome.into_message()),
        SaveCode::Saved | SaveCode::SavedAndExit => SaveResult::new(SaveState::Saved),
    }
}

/// The ordered side effects for a save that finished in `state`.
pub(crate) fn audit_trail(state: SaveState, request: &SaveRequest) -> Vec<AuditStep> {
    let exiting = request.is_exiting();
    let finalize = request.should_finalize();

    match state {
        SaveState::ConstraintError => vec![
            AuditStep::ExitView,
            AuditStep::Event(AuditEventType::ConstraintError, true),
        ],
        SaveState::FinalizeError => vec![AuditStep::Event(AuditEventType::FinalizeError, true)],
        SaveState::SaveError => vec![AuditStep::Event(AuditEventType::SaveError, true)],
        SaveState::Saved => {
            let mut trail = vec![AuditStep::Event(AuditEventType::FormSave, !exiting)];
            if exiting {
                trail.push(AuditStep::Event(AuditEventType::FormExit, !finalize));
                if finalize {
                    trail.push(AuditStep::Event(AuditEventType::FormFinalize, true));
                }
            }
            trail
        }
        SaveState::Saving | SaveState::AlreadySaving | SaveState::ChangeReasonRequired => {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(code: SaveCode, message: Option<&str>) -> SaveOutcome {
        match message {
            Some(message) => SaveOutcome::with_message(code, message),
            None => SaveOutcome::new(code),
        }
    }

    #[test]
    fn both_success_codes_are_saved() {
        assert_eq!(translate(outcome(SaveCode::Saved, None)).state(), SaveState::Saved);
        assert_eq!(
            translate(outcome(SaveCode::SavedAndExit, None)).state(),
            SaveState::Saved
        );
    }

    #[test]
    fn validation_codes_are_constraint_errors_without_message() {
        for code in [
            SaveCode::AnswerConstraintViolated,
            SaveCode::AnswerRequiredButEmpty,
        ] {
            let result = translate(outcome(code, Some("ignored")));
            assert_eq!(result.state(), SaveState::ConstraintError);
            assert_eq!(result.message(), None);
        }
    }

    #[test]
    fn failures_carry_backend_message() {
        let result = translate(outcome(SaveCode::SaveError, Some("OH NO")));
        assert_eq!(result.state(), SaveState::SaveError);
        assert_eq!(result.message(), Some("OH NO"));

        let result = translate(outcome(SaveCode::EncryptionError, Some("bad key")));
        assert_eq!(result.state(), SaveState::FinalizeError);
        assert_eq!(result.message(), Some("bad key"));

        let result = translate(outcome(SaveCode::SaveError, None));
        assert_eq!(result.message(), None);
    }

    #[test]
    fn constraint_error_exits_view_before_logging() {
        let request = SaveRequest::new("file://form", false, "", false);
        assert_eq!(
            audit_trail(SaveState::ConstraintError, &request),
            vec![
                AuditStep::ExitView,
                AuditStep::Event(AuditEventType::ConstraintError, true),
            ]
        );
    }

    #[test]
    fn error_events_are_logged_as_exiting() {
        let request = SaveRequest::new("file://form", true, "", false);
        assert_eq!(
            audit_trail(SaveState::SaveError, &request),
            vec![AuditStep::Event(AuditEventType::SaveError, true)]
        );
        assert_eq!(
            audit_trail(SaveState::FinalizeError, &request),
            vec![AuditStep::Event(AuditEventType::FinalizeError, true)]
        );
    }

    #[test]
    fn saved_without_exit_logs_only_form_save() {
        let request = SaveRequest::new("file://form", true, "", false);
        assert_eq!(
            audit_trail(SaveState::Saved, &request),
            vec![AuditStep::Event(AuditEventType::FormSave, true)]
        );
    }

    #[test]
    fn saved_and_exiting_draft_logs_unfinalized_exit() {
        let request = SaveRequest::new("file://form", false, "", true);
        assert_eq!(
            audit_trail(SaveState::Saved, &request),
            vec![
                AuditStep::Event(AuditEventType::FormSave, false),
                AuditStep::Event(AuditEventType::FormExit, true),
            ]
        );
    }

    #[test]
    fn saved_exiting_and_finalized_logs_finalize_last() {
        let request = SaveRequest::new("file://form", true, "", true);
        assert_eq!(
            audit_trail(SaveState::Saved, &request),
            vec![
                AuditStep::Event(AuditEventType::FormSave, false),
                AuditStep::Event(AuditEventType::FormExit, false),
                AuditStep::Event(AuditEventType::FormFinalize, true),
            ]
        );
    }

    #[test]
    fn non_terminal_states_have_no_trail() {
        let request = SaveRequest::new("file://form", true, "", true);
        assert!(audit_trail(SaveState::Saving, &request).is_empty());
        assert!(audit_trail(SaveState::AlreadySaving, &request).is_empty());
    }
}
