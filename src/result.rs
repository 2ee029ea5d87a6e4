//! Save states and the replay-last-value stream that carries them.
//!
//! Every [`SaveCoordinator::save_form`](crate::SaveCoordinator::save_form)
//! call returns a fresh [`SaveResultStream`]. The coordinator keeps the
//! writing half until the save it describes has finished; after that the
//! stream is read-only and keeps replaying its final value.

use std::fmt;

use futures::Stream;
use tokio::sync::watch;

/// Outward state of a save, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SaveState {
    /// The save is in progress, possibly still waiting for a change reason.
    Saving,
    /// Rejected: another save was already in progress.
    AlreadySaving,
    /// A change reason must be supplied before the save can proceed.
    ChangeReasonRequired,
    Saved,
    /// Generic persistence failure. Retry by saving again.
    SaveError,
    /// The current answers failed validation.
    ConstraintError,
    /// Finalizing (encrypting) the submission failed. Retry by saving again.
    FinalizeError,
}

impl SaveState {
    /// Returns `true` if no further updates follow this state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SaveState::Saving | SaveState::ChangeReasonRequired)
    }

    /// Returns `true` for the failure states.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            SaveState::SaveError | SaveState::ConstraintError | SaveState::FinalizeError
        )
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveState::Saving => "SAVING",
            SaveState::AlreadySaving => "ALREADY_SAVING",
            SaveState::ChangeReasonRequired => "CHANGE_REASON_REQUIRED",
            SaveState::Saved => "SAVED",
            SaveState::SaveError => "SAVE_ERROR",
            SaveState::ConstraintError => "CONSTRAINT_ERROR",
            SaveState::FinalizeError => "FINALIZE_ERROR",
        };
        f.write_str(name)
    }
}

/// One update pushed onto a [`SaveResultStream`].
///
/// Immutable; a later push supersedes it rather than changing it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaveResult {
    state: SaveState,
    message: Option<String>,
}

impl SaveResult {
    pub fn new(state: SaveState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(state: SaveState, message: Option<String>) -> Self {
        Self { state, message }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Diagnostic text from the backend, set for `SAVE_ERROR` and
    /// `FINALIZE_ERROR`.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Writing half of a result stream, owned by the coordinator.
#[derive(Debug)]
pub(crate) struct ResultPublisher {
    tx: watch::Sender<SaveResult>,
}

impl ResultPublisher {
    /// Replace the current value. Succeeds even with no observers.
    pub(crate) fn publish(&self, result: SaveResult) {
        self.tx.send_replace(result);
    }

    /// Move to `state` unless the stream already shows it.
    pub(crate) fn advance(&self, state: SaveState) {
        self.tx.send_if_modified(|current| {
            if current.state == state {
                return false;
            }
            *current = SaveResult::new(state);
            true
        });
    }

    pub(crate) fn subscribe(&self) -> SaveResultStream {
        SaveResultStream {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a stream seeded with `initial`, returning both halves.
pub(crate) fn channel(initial: SaveResult) -> (ResultPublisher, SaveResultStream) {
    let (tx, rx) = watch::channel(initial);
    (ResultPublisher { tx }, SaveResultStream { rx })
}

/// Observable, replay-last-value view of one save.
///
/// Clones observe the same save. Late subscribers see the most recent value
/// without triggering any work.
#[derive(Debug, Clone)]
pub struct SaveResultStream {
    rx: watch::Receiver<SaveResult>,
}

impl SaveResultStream {
    /// A stream that holds `result` forever and never updates.
    pub(crate) fn settled_with(result: SaveResult) -> Self {
        let (_, rx) = watch::channel(result);
        Self { rx }
    }

    /// The most recently pushed value.
    pub fn current(&self) -> SaveResult {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> SaveState {
        self.rx.borrow().state
    }

    /// Wait for the next push.
    ///
    /// Returns `None` once the coordinator has released the stream and no
    /// unseen value is left.
    pub async fn changed(&mut self) -> Option<SaveResult> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the stream reaches a terminal state and return it.
    ///
    /// If the stream is released before that happens (the coordinator was
    /// dropped while a reason was still outstanding), the latest value is
    /// returned instead.
    pub async fn settled(&mut self) -> SaveResult {
        let settled = self
            .rx
            .wait_for(|result| result.state.is_terminal())
            .await
            .map(|result| result.clone());
        settled.unwrap_or_else(|_| self.current())
    }

    /// Returns `true` if both handles observe the same save.
    pub fn is_same_stream(&self, other: &SaveResultStream) -> bool {
        self.rx.same_channel(&other.rx)
    }

    /// Adapt into a [`Stream`] yielding the current value first, then every
    /// later push. Intermediate values may be skipped if the consumer lags;
    /// the final one never is.
    pub fn into_stream(self) -> impl Stream<Item = SaveResult> + Send + 'static {
        let mut rx = self.rx;
        rx.mark_changed();
        futures::stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let value = rx.borrow_and_update().clone();
            Some((value, rx))
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!SaveState::Saving.is_terminal());
        assert!(!SaveState::ChangeReasonRequired.is_terminal());
        assert!(SaveState::AlreadySaving.is_terminal());
        assert!(SaveState::Saved.is_terminal());
        assert!(SaveState::SaveError.is_terminal());
        assert!(SaveState::ConstraintError.is_terminal());
        assert!(SaveState::FinalizeError.is_terminal());
        assert!(!SaveState::AlreadySaving.is_error());
    }

    #[test]
    fn state_display_matches_wire_names() {
        assert_eq!(SaveState::AlreadySaving.to_string(), "ALREADY_SAVING");
        assert_eq!(
            SaveState::ChangeReasonRequired.to_string(),
            "CHANGE_REASON_REQUIRED"
        );
    }

    #[test]
    fn stream_replays_latest_value() {
        let (publisher, stream) = channel(SaveResult::new(SaveState::Saving));
        publisher.publish(SaveResult::with_message(
            SaveState::SaveError,
            Some("disk full".into()),
        ));

        let late = publisher.subscribe();
        assert_eq!(stream.state(), SaveState::SaveError);
        assert_eq!(late.current().message(), Some("disk full"));
        assert!(late.is_same_stream(&stream));
    }

    #[test]
    fn advance_skips_repeated_state() {
        let (publisher, mut stream) = channel(SaveResult::new(SaveState::Saving));
        stream.rx.borrow_and_update();
        publisher.advance(SaveState::Saving);
        assert!(!stream.rx.has_changed().unwrap());

        publisher.advance(SaveState::Saved);
        assert!(stream.rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn settled_stream_keeps_its_value() {
        let mut stream = SaveResultStream::settled_with(SaveResult::new(SaveState::AlreadySaving));
        assert_eq!(stream.settled().await.state(), SaveState::AlreadySaving);
        assert_eq!(stream.changed().await, None);
        assert_eq!(stream.state(), SaveState::AlreadySaving);
    }

    #[tokio::test]
    async fn settled_waits_for_terminal_state() {
        let (publisher, mut stream) = channel(SaveResult::new(SaveState::Saving));
        let waiter = tokio::spawn(async move { stream.settled().await });

        publisher.publish(SaveResult::new(SaveState::Saved));
        assert_eq!(waiter.await.unwrap().state(), SaveState::Saved);
    }

    #[tokio::test]
    async fn settled_returns_latest_when_released_early() {
        let (publisher, mut stream) = channel(SaveResult::new(SaveState::Saving));
        drop(publisher);
        assert_eq!(stream.settled().await.state(), SaveState::Saving);
    }

    #[tokio::test]
    async fn into_stream_ends_with_final_value() {
        let (publisher, stream) = channel(SaveResult::new(SaveState::Saving));
        let collector = tokio::spawn(stream.into_stream().collect::<Vec<_>>());

        publisher.publish(SaveResult::new(SaveState::Saved));
        drop(publisher);

        let seen = collector.await.unwrap();
        assert_eq!(seen.last().map(SaveResult::state), Some(SaveState::Saved));
    }

    #[tokio::test]
    async fn distinct_channels_are_not_the_same_stream() {
        let (_a, first) = channel(SaveResult::new(SaveState::Saving));
        let (_b, second) = channel(SaveResult::new(SaveState::Saving));
        assert!(!first.is_same_stream(&second));
        assert!(first.is_same_stream(&first.clone()));
    }
}
