use thiserror::Error;

/// Shown when the whoami credential check comes back non-2xx.
pub const INVALID_API_KEY_MESSAGE: &str =
    "Invalid API Key. Set it in the app preferences and try again.";

/// Fallback for create failures whose response body carries no usable
/// `error` field, and for transport failures during create.
pub const GENERIC_SUBMISSION_FAILURE_MESSAGE: &str =
    "Failed to submit the bullet to Workflowy. Please check your API key and save location url and then try again.";

/// Failure taxonomy for a single capture attempt.
///
/// Every variant carries the human-readable message that ends up in the
/// failure notice; none of them is retried automatically and none is fatal
/// to the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// Bad or missing credentials. The user has to fix configuration.
    #[error("{0}")]
    Auth(String),
    /// The service rejected the bullet, or the transport failed. The user
    /// may resubmit manually.
    #[error("{0}")]
    Submission(String),
    /// Rejected at the form boundary before any request was issued.
    #[error("{0}")]
    Validation(String),
}

impl CaptureError {
    pub fn invalid_api_key() -> Self {
        Self::Auth(INVALID_API_KEY_MESSAGE.to_string())
    }

    pub fn generic_submission_failure() -> Self {
        Self::Submission(GENERIC_SUBMISSION_FAILURE_MESSAGE.to_string())
    }

    /// The user-facing notice text.
    pub fn message(&self) -> &str {
        match self {
            Self::Auth(message) | Self::Submission(message) | Self::Validation(message) => message,
        }
    }
}
