//! Backend commands queued from UI to backend worker.

use client_core::SubmitAction;

pub enum BackendCommand {
    /// Forward the current draft into the submission pipeline.
    Submit {
        title: String,
        note: String,
        action: SubmitAction,
    },
    /// Persist edited preferences and rebuild the service client.
    SaveSettings {
        api_key: String,
        save_location_url: String,
    },
}
