//! Builder for configuring a [`SaveCoordinator`].

use tokio::runtime::Handle;

use crate::audit::AuditLogger;
use crate::backend::PersistenceBackend;
use crate::clock::{Clock, SystemClock};
use crate::coordinator::{SaveCoordinator, Shared};
use crate::error::{FormSaveError, Result};

/// Builder for configuring and creating a [`SaveCoordinator`].
///
/// # Example
///
/// ```rust,no_run
/// use form_save::{
///     FixedClock, InMemoryAuditLog, PersistenceBackend, Result, SaveCode, SaveCoordinatorBuilder,
///     SaveOutcome, SaveRequest,
/// };
///
/// # struct Disk;
/// # impl PersistenceBackend for Disk {
/// #     async fn save(&self, _: &SaveRequest) -> Result<SaveOutcome> {
/// #         Ok(SaveOutcome::new(SaveCode::Saved))
/// #     }
/// # }
/// # async fn example() -> Result<()> {
/// let coordinator = SaveCoordinatorBuilder::new(Disk, InMemoryAuditLog::new())
///     .clock(FixedClock::from_millis(123))
///     .announce_change_reason(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SaveCoordinatorBuilder<B, L> {
    backend: B,
    audit_logger: L,
    clock: Box<dyn Clock>,
    announce_change_reason: bool,
}

impl<B: PersistenceBackend, L: AuditLogger> SaveCoordinatorBuilder<B, L> {
    /// Create a builder with the given collaborators.
    ///
    /// Defaults: [`SystemClock`], change-reason gate reported as `SAVING`.
    pub fn new(backend: B, audit_logger: L) -> Self {
        Self {
            backend,
            audit_logger,
            clock: Box::new(SystemClock),
            announce_change_reason: false,
        }
    }

    /// Source of the timestamps attached to audit events.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Report a save parked behind the change-reason gate as
    /// `CHANGE_REASON_REQUIRED` instead of `SAVING`.
    ///
    /// The stream moves to `SAVING` once the reason is accepted.
    pub fn announce_change_reason(mut self, announce: bool) -> Self {
        self.announce_change_reason = announce;
        self
    }

    /// Build a coordinator that runs saves on the current Tokio runtime.
    ///
    /// Returns [`FormSaveError::Config`] when called outside a runtime.
    pub fn build(self) -> Result<SaveCoordinator<B, L>> {
        let runtime = Handle::try_current()
            .map_err(|e| FormSaveError::Config(format!("no Tokio runtime to run saves on: {e}")))?;
        Ok(self.build_on(runtime))
    }

    /// Build a coordinator that runs saves on `runtime`.
    pub fn build_on(self, runtime: Handle) -> SaveCoordinator<B, L> {
        let shared = Shared::new(
            self.backend,
            self.audit_logger,
            self.clock,
            self.announce_change_reason,
        );
        SaveCoordinator::new(shared, runtime)
    }
}
