use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Result;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use shared::{
    domain::{Credentials, SubmissionInput, SubmissionState},
    error::{CaptureError, GENERIC_SUBMISSION_FAILURE_MESSAGE, INVALID_API_KEY_MESSAGE},
    protocol::CreateBulletRequest,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{
    BulletServiceClient, Notifier, NotifyKind, SubmissionController, SubmitAction, SubmitOutcome,
    SurfaceControl,
};

/// In-process stand-in for the bullet service. Records every request so the
/// tests can assert call counts, auth headers, and payloads.
#[derive(Clone)]
struct MockService {
    whoami_status: StatusCode,
    whoami_delay: Duration,
    /// Responses popped per create call; empty means 200 with an empty body.
    create_responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    whoami_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    whoami_bearers: Arc<Mutex<Vec<Option<String>>>>,
    create_requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

impl MockService {
    fn ok() -> Self {
        Self {
            whoami_status: StatusCode::OK,
            whoami_delay: Duration::ZERO,
            create_responses: Arc::new(Mutex::new(VecDeque::new())),
            whoami_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            whoami_bearers: Arc::new(Mutex::new(Vec::new())),
            create_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_whoami_status(mut self, status: StatusCode) -> Self {
        self.whoami_status = status;
        self
    }

    fn with_whoami_delay(mut self, delay: Duration) -> Self {
        self.whoami_delay = delay;
        self
    }

    async fn queue_create_response(&self, status: StatusCode, body: impl Into<String>) {
        self.create_responses
            .lock()
            .await
            .push_back((status, body.into()));
    }
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn whoami(State(service): State<MockService>, headers: HeaderMap) -> StatusCode {
    service.whoami_calls.fetch_add(1, Ordering::SeqCst);
    service.whoami_bearers.lock().await.push(bearer_of(&headers));
    if service.whoami_delay > Duration::ZERO {
        tokio::time::sleep(service.whoami_delay).await;
    }
    service.whoami_status
}

async fn create_bullet(
    State(service): State<MockService>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    service.create_calls.fetch_add(1, Ordering::SeqCst);
    let parsed =
        serde_json::from_str::<serde_json::Value>(&body).unwrap_or(serde_json::Value::Null);
    service
        .create_requests
        .lock()
        .await
        .push((bearer_of(&headers), parsed));
    match service.create_responses.lock().await.pop_front() {
        Some((status, body)) => (status, body),
        None => (StatusCode::OK, String::new()),
    }
}

async fn spawn_mock(service: MockService) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/me/", get(whoami))
        .route("/api/bullets/create/", post(create_bullet))
        .with_state(service);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[derive(Default)]
struct RecordingNotifier {
    notices: std::sync::Mutex<Vec<(NotifyKind, String, String)>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<(NotifyKind, String, String)> {
        self.notices.lock().expect("notifier lock").clone()
    }

    fn kinds(&self) -> Vec<NotifyKind> {
        self.notices().iter().map(|(kind, _, _)| *kind).collect()
    }

    fn failure_messages(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(kind, _, _)| *kind == NotifyKind::Failure)
            .map(|(_, _, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        self.notices
            .lock()
            .expect("notifier lock")
            .push((kind, title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
struct RecordingSurface {
    closed_at: std::sync::Mutex<Option<Instant>>,
}

impl RecordingSurface {
    fn close_requested(&self) -> bool {
        self.closed_at.lock().expect("surface lock").is_some()
    }
}

impl SurfaceControl for RecordingSurface {
    fn request_close(&self) {
        self.closed_at
            .lock()
            .expect("surface lock")
            .get_or_insert_with(Instant::now);
    }
}

const TEST_LINGER: Duration = Duration::from_millis(120);

fn controller_for(
    base_url: &str,
) -> (
    Arc<SubmissionController>,
    Arc<RecordingNotifier>,
    Arc<RecordingSurface>,
) {
    let notifier = Arc::new(RecordingNotifier::default());
    let surface = Arc::new(RecordingSurface::default());
    let client = BulletServiceClient::with_base_url(
        base_url,
        Credentials::new("test-key", "https://workflowy.com/#/inbox"),
    );
    let controller = Arc::new(
        SubmissionController::new(client, notifier.clone(), surface.clone())
            .with_close_linger(TEST_LINGER),
    );
    (controller, notifier, surface)
}

#[tokio::test]
async fn successful_submission_posts_once_and_clears_the_form() -> Result<()> {
    let service = MockService::ok();
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "2%").await;
    let outcome = controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(outcome, SubmitOutcome::Sent);
    assert_eq!(service.whoami_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 1);

    let whoami_bearers = service.whoami_bearers.lock().await;
    assert_eq!(whoami_bearers[0].as_deref(), Some("Bearer test-key"));

    let requests = service.create_requests.lock().await;
    let (bearer, body) = &requests[0];
    assert_eq!(bearer.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["new_bullet_title"], "Buy milk");
    assert_eq!(body["new_bullet_note"], "2%");
    assert_eq!(body["save_location_url"], "https://workflowy.com/#/inbox");
    let bullet_id = body["new_bullet_id"].as_str().expect("bullet id string");
    assert!(uuid::Uuid::parse_str(bullet_id).is_ok());

    let snapshot = controller.input_snapshot().await;
    assert!(snapshot.title.is_empty());
    assert!(snapshot.note.is_empty());
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(
        notifier.kinds(),
        vec![NotifyKind::InProgress, NotifyKind::Success]
    );
    Ok(())
}

#[tokio::test]
async fn rejected_credentials_stop_before_any_create_call() -> Result<()> {
    let service = MockService::ok().with_whoami_status(StatusCode::UNAUTHORIZED);
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    let outcome = controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(service.whoami_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        notifier.failure_messages(),
        vec![INVALID_API_KEY_MESSAGE.to_string()]
    );
    assert_eq!(controller.state(), SubmissionState::Idle);
    // The draft survives a failed attempt so the user can resubmit.
    assert_eq!(controller.input_snapshot().await.title, "Buy milk");
    Ok(())
}

#[tokio::test]
async fn create_failure_surfaces_the_service_error_message() -> Result<()> {
    let service = MockService::ok();
    service
        .queue_create_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"rate limited"}"#,
        )
        .await;
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    let outcome = controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(notifier.failure_messages(), vec!["rate limited".to_string()]);
    assert_eq!(controller.state(), SubmissionState::Idle);
    Ok(())
}

#[tokio::test]
async fn create_failure_with_unparsable_body_falls_back_to_generic_message() -> Result<()> {
    let service = MockService::ok();
    service
        .queue_create_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>")
        .await;
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(
        notifier.failure_messages(),
        vec![GENERIC_SUBMISSION_FAILURE_MESSAGE.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn create_failure_with_json_body_missing_error_field_falls_back_to_generic_message(
) -> Result<()> {
    let service = MockService::ok();
    service
        .queue_create_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"nope"}"#)
        .await;
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(
        notifier.failure_messages(),
        vec![GENERIC_SUBMISSION_FAILURE_MESSAGE.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn second_submit_while_in_flight_is_a_no_op() -> Result<()> {
    let service = MockService::ok().with_whoami_delay(Duration::from_millis(300));
    let base = spawn_mock(service.clone()).await?;
    let (controller, notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit(SubmitAction::SendAndAddAnother).await })
    };

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(controller.state(), SubmissionState::InFlight);
    let second = controller.submit(SubmitAction::SendAndAddAnother).await;
    assert_eq!(second, SubmitOutcome::Ignored);

    assert_eq!(first.await?, SubmitOutcome::Sent);
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(service.whoami_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 1);
    // The ignored duplicate produced no notices of its own.
    assert_eq!(
        notifier.kinds(),
        vec![NotifyKind::InProgress, NotifyKind::Success]
    );
    Ok(())
}

#[tokio::test]
async fn a_retry_after_failure_mints_a_fresh_bullet_id() -> Result<()> {
    let service = MockService::ok();
    service
        .queue_create_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"rate limited"}"#,
        )
        .await;
    let base = spawn_mock(service.clone()).await?;
    let (controller, _notifier, _surface) = controller_for(&base);

    controller.set_input("Buy milk", "2%").await;
    assert_eq!(
        controller.submit(SubmitAction::SendAndAddAnother).await,
        SubmitOutcome::Failed
    );
    // Same logical input again; the second wire payload must carry a new id.
    assert_eq!(controller.input_snapshot().await.title, "Buy milk");
    assert_eq!(
        controller.submit(SubmitAction::SendAndAddAnother).await,
        SubmitOutcome::Sent
    );

    let requests = service.create_requests.lock().await;
    assert_eq!(requests.len(), 2);
    let first_id = requests[0].1["new_bullet_id"].as_str().expect("first id");
    let second_id = requests[1].1["new_bullet_id"].as_str().expect("second id");
    assert_ne!(first_id, second_id);
    assert_eq!(requests[0].1["new_bullet_title"], "Buy milk");
    assert_eq!(requests[1].1["new_bullet_title"], "Buy milk");
    Ok(())
}

#[tokio::test]
async fn send_and_close_lingers_before_requesting_close() -> Result<()> {
    let service = MockService::ok();
    let base = spawn_mock(service).await?;
    let (controller, _notifier, surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    let started = Instant::now();
    let outcome = controller.submit(SubmitAction::SendAndClose).await;

    assert_eq!(outcome, SubmitOutcome::Sent);
    assert!(surface.close_requested());
    assert!(started.elapsed() >= TEST_LINGER);
    Ok(())
}

#[tokio::test]
async fn send_and_add_another_never_requests_close() -> Result<()> {
    let service = MockService::ok();
    let base = spawn_mock(service).await?;
    let (controller, _notifier, surface) = controller_for(&base);

    controller.set_input("Buy milk", "").await;
    let outcome = controller.submit(SubmitAction::SendAndAddAnother).await;

    assert_eq!(outcome, SubmitOutcome::Sent);
    tokio::time::sleep(TEST_LINGER + Duration::from_millis(80)).await;
    assert!(!surface.close_requested());
    Ok(())
}

#[tokio::test]
async fn transport_failures_surface_as_errors_not_panics() -> Result<()> {
    // Bind then drop to get an address nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = BulletServiceClient::with_base_url(
        format!("http://{addr}"),
        Credentials::new("test-key", "https://workflowy.com/#/inbox"),
    );

    match client.validate_credentials().await {
        Err(CaptureError::Auth(_)) => {}
        other => panic!("expected auth error, got {other:?}"),
    }

    let payload = CreateBulletRequest::for_attempt(
        &SubmissionInput::new("Buy milk", ""),
        client.credentials(),
    );
    match client.create_bullet(&payload).await {
        Err(CaptureError::Submission(message)) => {
            assert_eq!(message, GENERIC_SUBMISSION_FAILURE_MESSAGE);
        }
        other => panic!("expected submission error, got {other:?}"),
    }
    Ok(())
}
