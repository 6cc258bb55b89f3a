//! Fakes shared by the unit tests: a recording navigator, signed test
//! tokens, a scripted transport and a local axum portal.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot};
use url::Url;

use crate::{
    controller::DataFetchController,
    credential::{Credential, MemoryCredentialStore},
    session::{Navigator, SessionGate, SessionInvalidReason},
    transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse},
};

pub const TEST_BASE_URL: &str = "http://portal.test/";

#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<(String, SessionInvalidReason)>>,
}

impl RecordingNavigator {
    pub fn count(&self) -> usize {
        self.redirects.lock().expect("redirects").len()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, login_path: &str, reason: SessionInvalidReason) {
        self.redirects
            .lock()
            .expect("redirects")
            .push((login_path.to_string(), reason));
    }
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    exp: i64,
}

/// HS256 token signed with a key the client never sees.
pub fn jwt_expiring_in(seconds: i64) -> String {
    let claims = TestClaims {
        sub: "user-1".to_string(),
        exp: Utc::now().timestamp() + seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"server-side-secret"),
    )
    .expect("encode jwt")
}

enum Step {
    Respond(Result<TransportResponse, TransportError>),
    After(oneshot::Receiver<()>, Result<TransportResponse, TransportError>),
    Hang,
}

/// Answers by URL path from per-path queues, in the order they were scripted.
/// Unscripted paths answer 404 with an empty body.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn reply(&self, path: &str, status: u16, body: Value) {
        self.push(path, Step::Respond(Ok(response(status, &body))));
    }

    /// Response held back until the returned sender fires.
    pub fn reply_when(&self, path: &str, status: u16, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(path, Step::After(rx, Ok(response(status, &body))));
        tx
    }

    pub fn fail(&self, path: &str, error: TransportError) {
        self.push(path, Step::Respond(Err(error)));
    }

    pub fn hang(&self, path: &str) {
        self.push(path, Step::Hang);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests").len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests").clone()
    }

    /// Yields until `count` requests have reached the transport.
    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("requests never reached the transport");
    }

    fn push(&self, path: &str, step: Step) {
        self.steps
            .lock()
            .expect("steps")
            .entry(path.to_string())
            .or_default()
            .push_back(step);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let path = request.url.path().to_string();
        self.requests.lock().expect("requests").push(request);
        let step = self
            .steps
            .lock()
            .expect("steps")
            .get_mut(&path)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Respond(result)) => result,
            Some(Step::After(release, result)) => {
                let _ = release.await;
                result
            }
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }
}

fn response(status: u16, body: &Value) -> TransportResponse {
    TransportResponse {
        status,
        body: serde_json::to_vec(body).expect("encode body"),
    }
}

pub struct Harness {
    pub controller: Arc<DataFetchController>,
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub transport: Arc<ScriptedTransport>,
}

/// Controller over a [`ScriptedTransport`], optionally signed in.
pub fn harness(credential: Option<&str>) -> Harness {
    let store = Arc::new(match credential {
        Some(token) => MemoryCredentialStore::with_credential(Credential::new(token)),
        None => MemoryCredentialStore::new(),
    });
    let navigator = Arc::new(RecordingNavigator::default());
    let transport = Arc::new(ScriptedTransport::default());
    let gate = Arc::new(SessionGate::new(
        store.clone(),
        navigator.clone(),
        "/login",
        chrono::Duration::zero(),
    ));
    let controller = DataFetchController::new_with_transport(
        Url::parse(TEST_BASE_URL).expect("base url"),
        Duration::from_secs(5),
        gate,
        transport.clone(),
    );
    Harness {
        controller,
        store,
        navigator,
        transport,
    }
}

/// Controller over real HTTP, for tests against [`spawn_portal`].
pub fn http_controller(
    base_url: &str,
    credential: Option<&str>,
) -> (Arc<DataFetchController>, Arc<RecordingNavigator>) {
    let store = Arc::new(match credential {
        Some(token) => MemoryCredentialStore::with_credential(Credential::new(token)),
        None => MemoryCredentialStore::new(),
    });
    let navigator = Arc::new(RecordingNavigator::default());
    let gate = Arc::new(SessionGate::new(
        store,
        navigator.clone(),
        "/login",
        chrono::Duration::zero(),
    ));
    let controller = DataFetchController::new_with_transport(
        Url::parse(base_url).expect("base url"),
        Duration::from_secs(5),
        gate,
        Arc::new(HttpTransport::new()),
    );
    (controller, navigator)
}

pub async fn spawn_portal(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/"))
}
