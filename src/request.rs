//! The [`SaveRequest`] describing one save attempt, and the opaque
//! [`Locator`] naming the form instance being saved.

use std::fmt;

/// Opaque reference identifying which form instance to save.
///
/// The coordinator never interprets a locator; it is handed unchanged to
/// the [`PersistenceBackend`](crate::PersistenceBackend) and used in log
/// messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locator(String);

impl Locator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Locator {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single request to persist the in-progress submission.
///
/// Created per [`SaveCoordinator::save_form`](crate::SaveCoordinator::save_form)
/// call. A request parked behind the change-reason gate is re-issued as-is
/// once the reason is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    locator: Locator,
    should_finalize: bool,
    reason: String,
    is_exiting: bool,
}

impl SaveRequest {
    pub fn new(
        locator: impl Into<Locator>,
        should_finalize: bool,
        reason: impl Into<String>,
        is_exiting: bool,
    ) -> Self {
        Self {
            locator: locator.into(),
            should_finalize,
            reason: reason.into(),
            is_exiting,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Mark the submission complete rather than leaving it as a draft.
    pub fn should_finalize(&self) -> bool {
        self.should_finalize
    }

    /// Reason given at call time. May be empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The editing view is closed once this save finishes.
    pub fn is_exiting(&self) -> bool {
        self.is_exiting
    }
}

/// Returns the trimmed reason if it is acceptable as a change reason.
///
/// A reason is valid only when something other than whitespace remains
/// after trimming.
pub(crate) fn valid_reason(reason: &str) -> Option<&str> {
    let trimmed = reason.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reasons_are_rejected() {
        assert_eq!(valid_reason(""), None);
        assert_eq!(valid_reason("  "), None);
        assert_eq!(valid_reason("\t\n "), None);
    }

    #[test]
    fn reasons_are_trimmed() {
        assert_eq!(valid_reason("Blah"), Some("Blah"));
        assert_eq!(valid_reason("  fixed typo \n"), Some("fixed typo"));
    }

    #[test]
    fn locator_displays_verbatim() {
        let locator = Locator::from("file://form");
        assert_eq!(locator.to_string(), "file://form");
        assert_eq!(locator.as_str(), "file://form");
    }

    #[test]
    fn request_accessors() {
        let req = SaveRequest::new("file://form", true, "", false);
        assert_eq!(req.locator(), &Locator::new("file://form"));
        assert!(req.should_finalize());
        assert_eq!(req.reason(), "");
        assert!(!req.is_exiting());
    }
}
