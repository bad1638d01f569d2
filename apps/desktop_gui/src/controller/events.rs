//! Events flowing from the backend worker to the UI thread.

use client_core::NotifyKind;

pub enum UiEvent {
    /// Transient notice from the submission pipeline.
    Notice {
        kind: NotifyKind,
        title: String,
        message: String,
    },
    /// The bullet was accepted by the service; the draft can be reset.
    SubmissionAccepted,
    /// A "send and close" submission finished its linger; close the window.
    CloseRequested,
    /// Preferences were persisted, or failed to with the carried message.
    SettingsSaved { error: Option<String> },
    /// Plain status-line text.
    Info(String),
}
