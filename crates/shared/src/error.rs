use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{domain::Role, status::Action};

/// Error body returned by the portal backend on rejected mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    /// Parses a body only when it carries a non-empty `message`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(bytes)
            .ok()
            .filter(|body| !body.message.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal transition: cannot apply '{action}' to an application in state '{from}'")]
    IllegalTransition { from: String, action: Action },
    #[error("role '{role}' may not perform '{action}'")]
    ActorNotPermitted { role: Role, action: Action },
}

impl TransitionError {
    pub fn action(&self) -> Action {
        match self {
            Self::IllegalTransition { action, .. } | Self::ActorNotPermitted { action, .. } => {
                *action
            }
        }
    }
}
