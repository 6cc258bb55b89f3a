use std::fmt;

use serde_json::Value;
use shared::{error::ApiErrorBody, protocol::envelope_rejection};

use crate::session::SessionInvalidReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailureReason {
    Missing,
    Expired,
    Rejected {
        status: u16,
        message: Option<String>,
    },
}

impl From<SessionInvalidReason> for AuthFailureReason {
    fn from(value: SessionInvalidReason) -> Self {
        match value {
            SessionInvalidReason::Missing => Self::Missing,
            SessionInvalidReason::Expired => Self::Expired,
            SessionInvalidReason::Rejected => Self::Rejected {
                status: 401,
                message: None,
            },
        }
    }
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("not signed in"),
            Self::Expired => f.write_str("session expired"),
            Self::Rejected {
                status,
                message: Some(message),
            } => write!(f, "rejected with {status}: {message}"),
            Self::Rejected {
                status,
                message: None,
            } => write!(f, "rejected with {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCause {
    Timeout,
    Connect(String),
    Transport(String),
    UnexpectedStatus(u16),
    MalformedPayload(String),
}

impl fmt::Display for NetworkCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect(detail) => write!(f, "could not reach server: {detail}"),
            Self::Transport(detail) => write!(f, "transport failure: {detail}"),
            Self::UnexpectedStatus(status) => write!(f, "unexpected response status {status}"),
            Self::MalformedPayload(detail) => write!(f, "malformed response payload: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success { payload: Value },
    AuthFailure { reason: AuthFailureReason },
    NetworkFailure { cause: NetworkCause },
    ValidationFailure { server_message: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<ViewError> {
        match self {
            Self::Success { .. } => None,
            Self::AuthFailure { reason } => Some(ViewError::Session(reason.clone())),
            Self::NetworkFailure { cause } => Some(ViewError::Network(cause.clone())),
            Self::ValidationFailure { server_message } => {
                Some(ViewError::Validation(server_message.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Recovered by the login redirect; views do not render it inline.
    Session(AuthFailureReason),
    /// Transient; the view may offer a manual retry.
    Network(NetworkCause),
    /// Server message, shown verbatim.
    Validation(String),
}

impl ViewError {
    pub fn is_inline(&self) -> bool {
        !matches!(self, Self::Session(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(reason) => write!(f, "Session ended ({reason}). Please sign in again."),
            Self::Network(cause) => write!(f, "Network problem: {cause}. Please retry."),
            Self::Validation(message) => f.write_str(message),
        }
    }
}

/// Maps a completed HTTP exchange onto the outcome taxonomy.
pub fn classify_response(status: u16, body: &[u8]) -> FetchOutcome {
    if status == 401 || status == 403 {
        return FetchOutcome::AuthFailure {
            reason: AuthFailureReason::Rejected {
                status,
                message: ApiErrorBody::from_slice(body).map(|body| body.message),
            },
        };
    }

    if (200..300).contains(&status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return FetchOutcome::Success {
                payload: Value::Null,
            };
        }
        return match serde_json::from_slice::<Value>(body) {
            Ok(payload) => match envelope_rejection(&payload) {
                Some(server_message) => FetchOutcome::ValidationFailure { server_message },
                None => FetchOutcome::Success { payload },
            },
            Err(err) => FetchOutcome::NetworkFailure {
                cause: NetworkCause::MalformedPayload(err.to_string()),
            },
        };
    }

    match ApiErrorBody::from_slice(body) {
        Some(error) => FetchOutcome::ValidationFailure {
            server_message: error.message,
        },
        None => FetchOutcome::NetworkFailure {
            cause: NetworkCause::UnexpectedStatus(status),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unauthorized_and_forbidden_are_auth_failures() {
        for status in [401, 403] {
            let outcome = classify_response(status, br#"{"message":"Not authorized, token failed"}"#);
            assert_eq!(
                outcome,
                FetchOutcome::AuthFailure {
                    reason: AuthFailureReason::Rejected {
                        status,
                        message: Some("Not authorized, token failed".to_string()),
                    }
                }
            );
        }
    }

    #[test]
    fn error_body_is_a_validation_failure_verbatim() {
        assert_eq!(
            classify_response(400, br#"{"message":"interviewDate required"}"#),
            FetchOutcome::ValidationFailure {
                server_message: "interviewDate required".to_string()
            }
        );
        assert_eq!(
            classify_response(500, br#"{"message":"Server error","error":"boom"}"#),
            FetchOutcome::ValidationFailure {
                server_message: "Server error".to_string()
            }
        );
    }

    #[test]
    fn error_status_without_body_is_a_network_failure() {
        assert_eq!(
            classify_response(502, b"<html>Bad Gateway</html>"),
            FetchOutcome::NetworkFailure {
                cause: NetworkCause::UnexpectedStatus(502)
            }
        );
    }

    #[test]
    fn success_keeps_bare_arrays_and_envelopes() {
        assert_eq!(
            classify_response(200, br#"[{"_id":"a"}]"#),
            FetchOutcome::Success {
                payload: json!([{"_id": "a"}])
            }
        );
        assert_eq!(
            classify_response(200, br#"{"success":false,"message":"Profile incomplete"}"#),
            FetchOutcome::ValidationFailure {
                server_message: "Profile incomplete".to_string()
            }
        );
        assert_eq!(
            classify_response(204, b""),
            FetchOutcome::Success {
                payload: Value::Null
            }
        );
    }

    #[test]
    fn unparseable_success_body_is_malformed() {
        let outcome = classify_response(200, b"not json");
        assert!(matches!(
            outcome,
            FetchOutcome::NetworkFailure {
                cause: NetworkCause::MalformedPayload(_)
            }
        ));
    }

    #[test]
    fn session_errors_are_not_inline() {
        assert!(!ViewError::Session(AuthFailureReason::Expired).is_inline());
        assert!(ViewError::Validation("bad".into()).is_inline());
        assert!(ViewError::Network(NetworkCause::Timeout).is_retryable());
    }
}
