use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::credential::{ClearOutcome, Credential, CredentialStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInvalidReason {
    Missing,
    Expired,
    /// The server answered 401/403 for a request carrying the credential.
    Rejected,
}

impl fmt::Display for SessionInvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Missing => "no credential",
            Self::Expired => "credential expired",
            Self::Rejected => "credential rejected by server",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCheck {
    pub valid: bool,
    pub reason: Option<SessionInvalidReason>,
}

pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, login_path: &str, reason: SessionInvalidReason);
}

pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect_to_login(&self, login_path: &str, reason: SessionInvalidReason) {
        warn!(%reason, login_path, "session is no longer valid; sign in again");
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizedSession {
    pub credential: Credential,
    pub generation: u64,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

pub struct SessionGate {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    leeway: Duration,
    /// generation + 1 of the newest generation redirected for; 0 means none.
    redirected: AtomicU64,
}

impl SessionGate {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            store,
            navigator,
            login_path: login_path.into(),
            leeway,
            redirected: AtomicU64::new(0),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn check_session(&self) -> SessionCheck {
        match self.authorize() {
            Ok(_) => SessionCheck {
                valid: true,
                reason: None,
            },
            Err(reason) => SessionCheck {
                valid: false,
                reason: Some(reason),
            },
        }
    }

    pub fn authorize(&self) -> Result<AuthorizedSession, SessionInvalidReason> {
        let snapshot = self.store.snapshot();
        let Some(credential) = snapshot.credential else {
            self.redirect_once(snapshot.generation, SessionInvalidReason::Missing);
            return Err(SessionInvalidReason::Missing);
        };

        if self.is_expired(&credential, Utc::now()) {
            self.invalidate(snapshot.generation, SessionInvalidReason::Expired);
            return Err(SessionInvalidReason::Expired);
        }

        Ok(AuthorizedSession {
            credential,
            generation: snapshot.generation,
        })
    }

    pub fn login(&self, credential: Credential) -> u64 {
        let generation = self.store.install(credential);
        info!(generation, "credential installed");
        generation
    }

    pub fn logout(&self) {
        let generation = self.store.clear();
        info!(generation, "credential cleared by logout");
    }

    /// Returns whether this call issued the redirect.
    pub fn invalidate(&self, generation: u64, reason: SessionInvalidReason) -> bool {
        match self.store.clear_if(generation) {
            ClearOutcome::Superseded => {
                debug!(generation, %reason, "ignoring invalidation for a superseded credential");
                false
            }
            ClearOutcome::Cleared | ClearOutcome::AlreadyCleared => {
                self.redirect_once(generation, reason)
            }
        }
    }

    /// The leeway is an early-expiry margin: a token whose `exp` falls within
    /// `leeway` of `now` already counts as expired.
    pub fn is_expired(&self, credential: &Credential, now: DateTime<Utc>) -> bool {
        match token_expiry(credential.expose()) {
            Some(expires_at) => expires_at <= now + self.leeway,
            None => false,
        }
    }

    fn redirect_once(&self, generation: u64, reason: SessionInvalidReason) -> bool {
        let marker = generation + 1;
        if self.redirected.fetch_max(marker, Ordering::SeqCst) >= marker {
            return false;
        }
        info!(generation, %reason, login_path = %self.login_path, "redirecting to login");
        self.navigator.redirect_to_login(&self.login_path, reason);
        true
    }
}

/// Reads `exp` without verifying the signature. Opaque or claim-less tokens
/// yield `None` and are treated as non-expiring.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp?, 0)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
