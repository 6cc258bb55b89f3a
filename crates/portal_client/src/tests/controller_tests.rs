use super::*;
use axum::{http::HeaderMap, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{
    credential::CredentialStore,
    resources,
    test_support::{harness, http_controller, jwt_expiring_in, spawn_portal},
    transport::TransportError,
};

async fn echo_authorization(headers: HeaderMap) -> Json<Value> {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    Json(json!({ "applications": [], "authorization": authorization }))
}

#[tokio::test]
async fn attaches_bearer_credential_over_http() {
    let app = Router::new().route("/api/applications/me", get(echo_authorization));
    let base_url = spawn_portal(app).await.expect("spawn portal");
    let (controller, navigator) = http_controller(&base_url, Some("student-token"));

    let outcome = controller.execute(&resources::my_applications()).await;

    let payload = outcome.payload().expect("success");
    assert_eq!(payload["authorization"], json!("Bearer student-token"));
    assert_eq!(navigator.count(), 0);
}

#[tokio::test]
async fn public_request_goes_out_without_credential() {
    let fixture = harness(None);
    fixture
        .transport
        .reply("/api/jobs", 200, json!({ "jobs": [] }));

    let outcome = fixture
        .controller
        .execute(&resources::jobs().public())
        .await;

    assert!(outcome.is_success());
    let requests = fixture.transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].bearer.is_none());
    assert_eq!(fixture.navigator.count(), 0);
}

#[tokio::test]
async fn missing_credential_never_reaches_transport() {
    let fixture = harness(None);

    let outcome = fixture
        .controller
        .execute(&resources::my_applications())
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::AuthFailure {
            reason: AuthFailureReason::Missing
        }
    );
    assert_eq!(fixture.transport.calls(), 0);
    assert_eq!(fixture.navigator.count(), 1);
}

#[tokio::test]
async fn expired_credential_is_caught_before_sending() {
    let fixture = harness(Some(jwt_expiring_in(-30).as_str()));

    let outcome = fixture.controller.execute(&resources::mentor_queue()).await;

    assert_eq!(
        outcome,
        FetchOutcome::AuthFailure {
            reason: AuthFailureReason::Expired
        }
    );
    assert_eq!(fixture.transport.calls(), 0);
    assert!(fixture.store.snapshot().credential.is_none());
    assert_eq!(fixture.navigator.count(), 1);
}

#[tokio::test]
async fn server_rejection_clears_credential_and_redirects_once() {
    let fixture = harness(Some("revoked-token"));
    fixture.transport.reply(
        "/api/applications/me",
        401,
        json!({ "message": "Not authorized, token failed" }),
    );

    let first = fixture
        .controller
        .execute(&resources::my_applications())
        .await;
    let second = fixture
        .controller
        .execute(&resources::my_applications())
        .await;

    assert_eq!(
        first,
        FetchOutcome::AuthFailure {
            reason: AuthFailureReason::Rejected {
                status: 401,
                message: Some("Not authorized, token failed".to_string()),
            }
        }
    );
    assert_eq!(
        second,
        FetchOutcome::AuthFailure {
            reason: AuthFailureReason::Missing
        }
    );
    assert_eq!(fixture.transport.calls(), 1);
    assert!(fixture.store.snapshot().credential.is_none());
    assert_eq!(fixture.navigator.count(), 1);
}

#[tokio::test]
async fn slow_server_times_out() {
    let fixture = harness(Some("token"));
    fixture.transport.hang("/api/applications/mentor");

    let outcome = fixture
        .controller
        .execute(&resources::mentor_queue().timeout(Duration::from_millis(50)))
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::NetworkFailure {
            cause: NetworkCause::Timeout
        }
    );
    assert_eq!(fixture.navigator.count(), 0);
}

#[tokio::test]
async fn transport_errors_become_network_failures() {
    let fixture = harness(Some("token"));
    fixture.transport.fail(
        "/api/jobs",
        TransportError::Connect("connection refused".to_string()),
    );

    let outcome = fixture.controller.execute(&resources::jobs()).await;

    assert_eq!(
        outcome,
        FetchOutcome::NetworkFailure {
            cause: NetworkCause::Connect("connection refused".to_string())
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_a_connect_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let (controller, _navigator) = http_controller(&format!("http://{addr}/"), Some("token"));

    let outcome = controller.execute(&resources::jobs()).await;

    assert!(
        matches!(
            outcome,
            FetchOutcome::NetworkFailure {
                cause: NetworkCause::Connect(_)
            }
        ),
        "unexpected outcome: {outcome:?}"
    );
}

#[tokio::test]
async fn validation_message_is_kept_verbatim() {
    let fixture = harness(Some("token"));
    fixture.transport.reply(
        "/api/applications/job-1/apply",
        400,
        json!({ "message": "You have already applied for this job" }),
    );

    let descriptor = resources::apply_to_job(&shared::domain::JobId::new("job-1"), "")
        .expect("descriptor");
    let outcome = fixture.controller.execute(&descriptor).await;

    assert_eq!(
        outcome,
        FetchOutcome::ValidationFailure {
            server_message: "You have already applied for this job".to_string()
        }
    );
    assert_eq!(
        outcome.failure().expect("failure").to_string(),
        "You have already applied for this job"
    );
}

#[tokio::test]
async fn query_and_body_are_forwarded() {
    let fixture = harness(Some("token"));
    fixture
        .transport
        .reply("/api/applications/recruiter", 200, json!([]));

    fixture
        .controller
        .execute(&resources::recruiter_applications(
            shared::status::StatusFilter::Only(shared::status::ApplicationStatus::Hired),
        ))
        .await;

    let request = &fixture.transport.requests()[0];
    assert_eq!(request.url.as_str(), "http://portal.test/api/applications/recruiter");
    assert_eq!(
        request.query,
        vec![("status".to_string(), "hired".to_string())]
    );
    assert_eq!(
        request.bearer.as_ref().map(|credential| credential.expose()),
        Some("token")
    );
}
