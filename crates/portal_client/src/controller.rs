use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    descriptor::RequestDescriptor,
    error::ClientError,
    outcome::{classify_response, AuthFailureReason, FetchOutcome, NetworkCause},
    session::{SessionGate, SessionInvalidReason},
    transport::{HttpTransport, Transport, TransportRequest},
    view::View,
};

pub struct DataFetchController {
    transport: Arc<dyn Transport>,
    gate: Arc<SessionGate>,
    base_url: Url,
    default_timeout: Duration,
}

impl DataFetchController {
    pub fn new(settings: &ClientSettings, gate: Arc<SessionGate>) -> Result<Arc<Self>, ClientError> {
        Ok(Self::new_with_transport(
            settings.base_url()?,
            settings.request_timeout(),
            gate,
            Arc::new(HttpTransport::new()),
        ))
    }

    pub fn new_with_transport(
        base_url: Url,
        default_timeout: Duration,
        gate: Arc<SessionGate>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            gate,
            base_url,
            default_timeout,
        })
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Creates the state container for one mounted screen.
    pub fn mount(self: &Arc<Self>, view_name: impl Into<String>) -> View {
        View::new(Arc::clone(self), view_name.into())
    }

    /// Issues one request and classifies the result. The session check runs
    /// before anything else; a failing check never reaches the transport.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> FetchOutcome {
        let session = if descriptor.requires_credential() {
            match self.gate.authorize() {
                Ok(session) => Some(session),
                Err(reason) => {
                    debug!(key = %descriptor.key(), %reason, "request suppressed by session gate");
                    return FetchOutcome::AuthFailure {
                        reason: reason.into(),
                    };
                }
            }
        } else {
            None
        };

        let url = match self.base_url.join(descriptor.path()) {
            Ok(url) => url,
            Err(err) => {
                return FetchOutcome::NetworkFailure {
                    cause: NetworkCause::Transport(format!(
                        "invalid request path '{}': {err}",
                        descriptor.path()
                    )),
                }
            }
        };

        let generation = session.as_ref().map(|session| session.generation);
        let request = TransportRequest {
            method: descriptor.method(),
            url,
            query: descriptor.query_pairs().to_vec(),
            bearer: session.map(|session| session.credential),
            body: descriptor.body_json().cloned(),
        };

        let timeout = descriptor.timeout_override().unwrap_or(self.default_timeout);
        let outcome = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_elapsed) => FetchOutcome::NetworkFailure {
                cause: NetworkCause::Timeout,
            },
            Ok(Err(err)) => FetchOutcome::NetworkFailure { cause: err.into() },
            Ok(Ok(response)) => classify_response(response.status, &response.body),
        };

        match &outcome {
            FetchOutcome::AuthFailure {
                reason: AuthFailureReason::Rejected { status, .. },
            } => {
                warn!(key = %descriptor.key(), status, "server rejected credential");
                if let Some(generation) = generation {
                    self.gate
                        .invalidate(generation, SessionInvalidReason::Rejected);
                }
            }
            FetchOutcome::Success { .. } | FetchOutcome::AuthFailure { .. } => {}
            FetchOutcome::NetworkFailure { cause } => {
                warn!(
                    key = %descriptor.key(),
                    method = descriptor.method().as_str(),
                    %cause,
                    "request failed in transport"
                );
            }
            FetchOutcome::ValidationFailure { server_message } => {
                warn!(key = %descriptor.key(), %server_message, "server rejected request");
            }
        }

        outcome
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
