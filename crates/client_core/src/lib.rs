//! Core capture pipeline: the Workflowy bullet client plus the submission
//! controller that sequences a single capture attempt.

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use reqwest::{header::CONTENT_TYPE, Client};
use shared::{
    domain::{Credentials, SubmissionInput, SubmissionState},
    error::{CaptureError, GENERIC_SUBMISSION_FAILURE_MESSAGE},
    protocol::{ApiErrorBody, CreateBulletRequest},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Production service origin.
pub const DEFAULT_SERVICE_URL: &str = "https://beta.workflowy.com";

/// How long the success notice stays visible before a "send and close"
/// submission actually closes the surface.
pub const SUCCESS_CLOSE_LINGER: Duration = Duration::from_secs(1);

/// Severity of a transient user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    InProgress,
    Success,
    Failure,
}

/// Narrow capability the controller uses to surface transient notices.
/// Keeps the core free of any concrete UI dependency.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str);
}

/// Capability to close the hosting presentation surface.
pub trait SurfaceControl: Send + Sync {
    fn request_close(&self);
}

/// Completion behavior the user picked on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    SendAndClose,
    SendAndAddAnother,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another attempt was already in flight; nothing was sent or notified.
    Ignored,
    /// The attempt failed; a failure notice carried the message.
    Failed,
    /// The bullet was created and the form cleared.
    Sent,
}

/// Client for the two authenticated service endpoints. Each operation issues
/// exactly one outbound request; there are no retries and no timeout override
/// beyond the transport default.
pub struct BulletServiceClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl BulletServiceClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(DEFAULT_SERVICE_URL, credentials)
    }

    /// Points the client at a different origin. Tests use this to target a
    /// local mock server.
    pub fn with_base_url(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Read-only whoami check. Any non-2xx means the key is unusable; a
    /// transport failure surfaces as an auth error rather than a panic.
    pub async fn validate_credentials(&self) -> Result<(), CaptureError> {
        let response = self
            .http
            .get(format!("{}/api/me/", self.base_url))
            .bearer_auth(&self.credentials.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| {
                warn!("credential check transport failure: {err}");
                CaptureError::Auth(err.to_string())
            })?;

        if response.status().is_success() {
            debug!("credential check passed");
            Ok(())
        } else {
            warn!(
                status = response.status().as_u16(),
                "credential check rejected"
            );
            Err(CaptureError::invalid_api_key())
        }
    }

    /// Creates one bullet at the configured save location.
    pub async fn create_bullet(&self, payload: &CreateBulletRequest) -> Result<(), CaptureError> {
        let response = self
            .http
            .post(format!("{}/api/bullets/create/", self.base_url))
            .bearer_auth(&self.credentials.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                warn!("bullet create transport failure: {err}");
                CaptureError::generic_submission_failure()
            })?;

        let status = response.status();
        if status.is_success() {
            info!(bullet_id = %payload.new_bullet_id, "bullet created");
            return Ok(());
        }

        // A non-JSON body and a JSON body missing the `error` field both
        // collapse to the generic message.
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| GENERIC_SUBMISSION_FAILURE_MESSAGE.to_string());
        warn!(status = status.as_u16(), "bullet create rejected: {message}");
        Err(CaptureError::Submission(message))
    }
}

/// Explicit mutable form state owned by the controller. The presentation
/// shell pushes edits in; nothing is bound reactively.
#[derive(Debug, Default)]
pub struct FormState {
    title: String,
    note: String,
}

impl FormState {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn snapshot(&self) -> SubmissionInput {
        SubmissionInput::new(self.title.clone(), self.note.clone())
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.note.clear();
    }
}

const STATE_IDLE: u8 = 0;
const STATE_IN_FLIGHT: u8 = 1;

/// Idle/InFlight gate. The compare-or-ignore transition keeps the duplicate
/// submit guard correct even when the controller is driven from several
/// tasks, not just a single-threaded event loop.
struct SubmissionGate(AtomicU8);

impl SubmissionGate {
    fn new() -> Self {
        Self(AtomicU8::new(STATE_IDLE))
    }

    /// Idle -> InFlight, or `false` if an attempt is already running.
    fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(
                STATE_IDLE,
                STATE_IN_FLIGHT,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn finish(&self) {
        self.0.store(STATE_IDLE, Ordering::Release);
    }

    fn state(&self) -> SubmissionState {
        match self.0.load(Ordering::Acquire) {
            STATE_IN_FLIGHT => SubmissionState::InFlight,
            _ => SubmissionState::Idle,
        }
    }
}

/// Sequences one capture attempt: duplicate-submit guard, credential check,
/// bullet create, user feedback, and the optional close of the surface.
pub struct SubmissionController {
    client: BulletServiceClient,
    form: Mutex<FormState>,
    gate: SubmissionGate,
    notifier: Arc<dyn Notifier>,
    surface: Arc<dyn SurfaceControl>,
    close_linger: Duration,
}

impl SubmissionController {
    pub fn new(
        client: BulletServiceClient,
        notifier: Arc<dyn Notifier>,
        surface: Arc<dyn SurfaceControl>,
    ) -> Self {
        Self {
            client,
            form: Mutex::new(FormState::default()),
            gate: SubmissionGate::new(),
            notifier,
            surface,
            close_linger: SUCCESS_CLOSE_LINGER,
        }
    }

    /// Overrides the post-success linger before "send and close" closes the
    /// surface. Tests shorten this.
    pub fn with_close_linger(mut self, linger: Duration) -> Self {
        self.close_linger = linger;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.gate.state()
    }

    pub async fn set_input(&self, title: impl Into<String>, note: impl Into<String>) {
        let mut form = self.form.lock().await;
        form.set_title(title);
        form.set_note(note);
    }

    pub async fn input_snapshot(&self) -> SubmissionInput {
        self.form.lock().await.snapshot()
    }

    /// Runs one attempt end to end.
    ///
    /// The title is assumed non-blank here; the form boundary enforces that
    /// before submit is ever invoked. The gate is released before the
    /// close linger, so the state is Idle for the whole time the success
    /// notice stays on screen.
    pub async fn submit(&self, action: SubmitAction) -> SubmitOutcome {
        if !self.gate.try_begin() {
            debug!("submit ignored: attempt already in flight");
            return SubmitOutcome::Ignored;
        }

        let input = self.form.lock().await.snapshot();
        self.notifier
            .notify(NotifyKind::InProgress, "Sending to Workflowy...", "");
        let result = self.run_attempt(&input).await;
        self.gate.finish();

        match result {
            Err(err) => {
                self.notifier
                    .notify(NotifyKind::Failure, "Error", err.message());
                SubmitOutcome::Failed
            }
            Ok(()) => {
                self.notifier.notify(
                    NotifyKind::Success,
                    "Success!",
                    "Added the bullet to your Workflowy inbox.",
                );
                if action == SubmitAction::SendAndClose {
                    tokio::time::sleep(self.close_linger).await;
                    self.surface.request_close();
                }
                SubmitOutcome::Sent
            }
        }
    }

    async fn run_attempt(&self, input: &SubmissionInput) -> Result<(), CaptureError> {
        self.client.validate_credentials().await?;

        // A fresh payload per attempt: retries after failure never reuse the
        // prior bullet id.
        let payload = CreateBulletRequest::for_attempt(input, self.client.credentials());
        self.client.create_bullet(&payload).await?;

        self.form.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests;
