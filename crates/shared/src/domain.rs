use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// User-entered text captured from the form at submit time.
///
/// Built once per attempt and discarded after the request completes; nothing
/// here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionInput {
    pub title: String,
    pub note: String,
}

impl SubmissionInput {
    pub fn new(title: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            note: note.into(),
        }
    }

    /// Boundary validation: a submission needs a non-blank title.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// API key plus target save location, supplied by the persisted preference
/// store. Read-only to the core; empty values are valid and simply fail
/// credential validation downstream.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub save_location_url: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, save_location_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            save_location_url: save_location_url.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.save_location_url.trim().is_empty()
    }
}

// The key must never end up in logs or debug dumps.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("save_location_url", &self.save_location_url)
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    InFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_fail_boundary_validation() {
        assert!(SubmissionInput::new("Buy milk", "").has_title());
        assert!(!SubmissionInput::new("", "a note").has_title());
        assert!(!SubmissionInput::new("   ", "a note").has_title());
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let credentials = Credentials::new("wf-secret-key", "https://workflowy.com/#/abc");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("wf-secret-key"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("https://workflowy.com/#/abc"));
    }

    #[test]
    fn empty_credentials_are_valid_but_unconfigured() {
        assert!(!Credentials::default().is_configured());
        assert!(!Credentials::new("key", "  ").is_configured());
        assert!(Credentials::new("key", "https://workflowy.com/#/abc").is_configured());
    }
}
