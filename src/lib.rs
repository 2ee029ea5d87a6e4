//! # form_save
//!
//! Coordinates saving an in-progress form submission to durable storage
//! while keeping an accurate audit trail.
//!
//! ## Overview
//!
//! A [`SaveCoordinator`] hands save requests to a [`PersistenceBackend`] on a
//! background task and reports progress on a per-request
//! [`SaveResultStream`]. It guarantees that:
//!
//! - at most one save is in flight; extra requests get `ALREADY_SAVING`,
//! - when the [`AuditLogger`] policy demands it, a save waits for a change
//!   reason ([`SaveCoordinator::set_reason`] + [`SaveCoordinator::save_reason`]),
//! - every completed save leaves its audit events in a fixed order, recorded
//!   before the final state is pushed.
//!
//! Backend failures never escape as errors; they become `SAVE_ERROR`,
//! `FINALIZE_ERROR` or `CONSTRAINT_ERROR` results.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use form_save::{
//!     InMemoryAuditLog, PersistenceBackend, Result, SaveCode, SaveCoordinatorBuilder,
//!     SaveOutcome, SaveRequest, SaveState,
//! };
//!
//! struct Disk;
//!
//! impl PersistenceBackend for Disk {
//!     async fn save(&self, request: &SaveRequest) -> Result<SaveOutcome> {
//!         // write the submission somewhere ...
//!         Ok(SaveOutcome::new(SaveCode::Saved))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let coordinator = SaveCoordinatorBuilder::new(Disk, InMemoryAuditLog::new()).build()?;
//!
//! let mut saving = coordinator.save_form("file://forms/1", true, "", true);
//! assert_eq!(saving.settled().await.state(), SaveState::Saved);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `serde` | no | `Serialize`/`Deserialize` for results, result codes and audit events. |

pub mod audit;
pub mod backend;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod result;
mod worker;

pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditRecord, InMemoryAuditLog};
pub use backend::{PersistenceBackend, SaveCode, SaveOutcome};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SaveCoordinatorBuilder;
pub use coordinator::SaveCoordinator;
pub use error::{FormSaveError, Result};
pub use request::{Locator, SaveRequest};
pub use result::{SaveResult, SaveResultStream, SaveState};
