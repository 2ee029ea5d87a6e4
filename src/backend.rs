//! The persistence backend that writes a submission to durable storage.
//!
//! The coordinator does not know how a submission is encoded or where it
//! lives. It hands each [`SaveRequest`] to a [`PersistenceBackend`] and
//! translates the returned [`SaveCode`] into an outward
//! [`SaveState`](crate::SaveState).

use std::future::Future;

use crate::error::Result;
use crate::request::SaveRequest;

/// Result codes a backend reports for a completed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SaveCode {
    Saved,
    SavedAndExit,
    SaveError,
    /// Encrypting the finalized submission failed.
    EncryptionError,
    AnswerConstraintViolated,
    AnswerRequiredButEmpty,
}

/// What a backend returns once a save has run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    code: SaveCode,
    message: Option<String>,
}

impl SaveOutcome {
    pub fn new(code: SaveCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// An outcome carrying diagnostic text, typically for
    /// [`SaveCode::SaveError`] and [`SaveCode::EncryptionError`].
    pub fn with_message(code: SaveCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn code(&self) -> SaveCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn into_message(self) -> Option<String> {
        self.message
    }
}

/// Trait for backends that persist a form submission.
///
/// A save may take arbitrarily long; it runs on a spawned task and is never
/// cancelled or retried by the coordinator. Timeouts, if any, belong here.
///
/// Returning `Err` is reserved for failures outside the [`SaveCode`]
/// vocabulary. The coordinator reports them as `SAVE_ERROR` with the error's
/// text as message.
///
/// # Implementing a backend
///
/// ```rust,no_run
/// use form_save::{PersistenceBackend, Result, SaveCode, SaveOutcome, SaveRequest};
///
/// struct Discard;
///
/// impl PersistenceBackend for Discard {
///     async fn save(&self, request: &SaveRequest) -> Result<SaveOutcome> {
///         let code = if request.is_exiting() {
///             SaveCode::SavedAndExit
///         } else {
///             SaveCode::Saved
///         };
///         Ok(SaveOutcome::new(code))
///     }
/// }
/// ```
pub trait PersistenceBackend: Send + Sync + 'static {
    /// Persist the submission described by `request`.
    fn save(&self, request: &SaveRequest) -> impl Future<Output = Result<SaveOutcome>> + Send;
}
