use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Credentials, SubmissionInput};

/// Body of `POST /api/bullets/create/`. Field names are the service's wire
/// contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBulletRequest {
    pub new_bullet_id: Uuid,
    pub new_bullet_title: String,
    pub new_bullet_note: String,
    pub save_location_url: String,
}

impl CreateBulletRequest {
    /// Builds the payload for exactly one outbound attempt.
    ///
    /// Every call mints a fresh bullet id; a resubmission after failure gets
    /// a new id rather than reusing the prior one.
    pub fn for_attempt(input: &SubmissionInput, credentials: &Credentials) -> Self {
        Self {
            new_bullet_id: Uuid::new_v4(),
            new_bullet_title: input.title.clone(),
            new_bullet_note: input.note.clone(),
            save_location_url: credentials.save_location_url.clone(),
        }
    }
}

/// Error body the service may attach to a non-2xx create response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
