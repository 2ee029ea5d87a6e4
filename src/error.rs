//! Error types for the `form_save` crate.

/// All errors that can occur while coordinating a form save.
///
/// Only [`SaveCoordinatorBuilder::build`](crate::SaveCoordinatorBuilder::build)
/// returns these to callers. Failures raised while a save is in flight are
/// converted into a [`SaveResult`](crate::SaveResult) on the result stream.
#[derive(Debug, thiserror::Error)]
pub enum FormSaveError {
    /// A persistence backend failed without producing a result code.
    #[error("Persistence backend failed: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),

    /// The task running the persistence backend panicked or was cancelled.
    #[error("Save task aborted: {0}")]
    TaskAborted(String),

    /// The builder configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

/// A type alias for `Result<T, FormSaveError>`.
pub type Result<T> = std::result::Result<T, FormSaveError>;
