use std::sync::Arc;

use shared::protocol::{LoginRequest, LoginResponse};
use tracing::info;

use crate::{
    controller::DataFetchController,
    credential::Credential,
    descriptor::RequestDescriptor,
    error::ClientError,
    outcome::{AuthFailureReason, FetchOutcome},
};

const LOGIN_FAILED: &str = "Login failed";

pub struct AuthClient {
    controller: Arc<DataFetchController>,
}

impl AuthClient {
    pub fn new(controller: Arc<DataFetchController>) -> Self {
        Self { controller }
    }

    /// Exchanges email/password for a token and installs it as the current
    /// credential. Earlier redirects are re-armed by the new generation.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let descriptor = RequestDescriptor::post("/api/auth/login")
            .public()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?;

        match self.controller.execute(&descriptor).await {
            FetchOutcome::Success { payload } => {
                let body: LoginResponse = serde_json::from_value(payload)?;
                if body.token.trim().is_empty() {
                    return Err(ClientError::LoginRejected(LOGIN_FAILED.to_string()));
                }
                let generation = self
                    .controller
                    .gate()
                    .login(Credential::new(body.token.clone()));
                info!(generation, role = ?body.role, "signed in");
                Ok(body)
            }
            FetchOutcome::ValidationFailure { server_message } => {
                Err(ClientError::LoginRejected(server_message))
            }
            FetchOutcome::AuthFailure {
                reason: AuthFailureReason::Rejected { message, .. },
            } => Err(ClientError::LoginRejected(
                message.unwrap_or_else(|| LOGIN_FAILED.to_string()),
            )),
            FetchOutcome::AuthFailure { reason } => Err(ClientError::Unauthorized(reason)),
            FetchOutcome::NetworkFailure { cause } => Err(ClientError::Network(cause)),
        }
    }

    pub fn logout(&self) {
        self.controller.gate().logout();
    }
}
