use thiserror::Error;

use crate::outcome::{AuthFailureReason, NetworkCause};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("not authorized: {0}")]
    Unauthorized(AuthFailureReason),
    #[error("network failure: {0}")]
    Network(NetworkCause),
}
