use super::*;
use crate::{
    credential::MemoryCredentialStore,
    test_support::{jwt_expiring_in, RecordingNavigator},
};

fn gate_with(
    credential: Option<&str>,
) -> (SessionGate, Arc<MemoryCredentialStore>, Arc<RecordingNavigator>) {
    let store = Arc::new(match credential {
        Some(token) => MemoryCredentialStore::with_credential(Credential::new(token)),
        None => MemoryCredentialStore::new(),
    });
    let navigator = Arc::new(RecordingNavigator::default());
    let gate = SessionGate::new(store.clone(), navigator.clone(), "/login", Duration::zero());
    (gate, store, navigator)
}

#[test]
fn missing_credential_is_invalid() {
    let (gate, _store, navigator) = gate_with(None);
    let check = gate.check_session();
    assert!(!check.valid);
    assert_eq!(check.reason, Some(SessionInvalidReason::Missing));
    assert_eq!(navigator.count(), 1);
    assert_eq!(
        navigator.redirects.lock().expect("redirects")[0].0,
        "/login".to_string()
    );
}

#[test]
fn live_jwt_is_valid_and_does_not_redirect() {
    let (gate, _store, navigator) = gate_with(Some(jwt_expiring_in(3600).as_str()));
    assert_eq!(
        gate.check_session(),
        SessionCheck {
            valid: true,
            reason: None
        }
    );
    assert_eq!(navigator.count(), 0);
}

#[test]
fn opaque_token_without_expiry_is_valid() {
    let (gate, _store, _navigator) = gate_with(Some("opaque-session-token"));
    assert!(gate.check_session().valid);
}

#[test]
fn expired_jwt_clears_credential_and_redirects_exactly_once() {
    let (gate, store, navigator) = gate_with(Some(jwt_expiring_in(-60).as_str()));

    for _ in 0..5 {
        let check = gate.check_session();
        assert!(!check.valid);
    }

    assert!(store.snapshot().credential.is_none());
    assert_eq!(navigator.count(), 1);
    assert_eq!(
        navigator.redirects.lock().expect("redirects")[0].1,
        SessionInvalidReason::Expired
    );
}

#[test]
fn leeway_treats_nearly_expired_tokens_as_expired() {
    let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
        jwt_expiring_in(30),
    )));
    let navigator = Arc::new(RecordingNavigator::default());
    let gate = SessionGate::new(store, navigator, "/login", Duration::seconds(120));
    assert_eq!(gate.check_session().reason, Some(SessionInvalidReason::Expired));
}

#[test]
fn login_rearms_redirect_after_invalidation() {
    let (gate, _store, navigator) = gate_with(Some(jwt_expiring_in(-60).as_str()));
    assert!(!gate.check_session().valid);
    assert_eq!(navigator.count(), 1);

    gate.login(Credential::new(jwt_expiring_in(-1)));
    assert!(!gate.check_session().valid);
    assert!(!gate.check_session().valid);
    assert_eq!(navigator.count(), 2);
}

#[test]
fn invalidation_for_a_superseded_generation_is_ignored() {
    let (gate, store, navigator) = gate_with(Some("first"));
    let stale = store.snapshot().generation;
    gate.login(Credential::new("second"));

    assert!(!gate.invalidate(stale, SessionInvalidReason::Rejected));
    assert_eq!(navigator.count(), 0);
    assert!(gate.check_session().valid);
}

#[test]
fn concurrent_invalidations_navigate_once() {
    let (gate, store, navigator) = gate_with(Some("shared-token"));
    let gate = Arc::new(gate);
    let generation = store.snapshot().generation;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.invalidate(generation, SessionInvalidReason::Rejected))
        })
        .collect();
    let navigated = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|navigated| *navigated)
        .count();

    assert_eq!(navigated, 1);
    assert_eq!(navigator.count(), 1);
}

#[test]
fn logout_clears_and_next_check_redirects_once() {
    let (gate, _store, navigator) = gate_with(Some("token"));
    gate.logout();
    assert_eq!(gate.check_session().reason, Some(SessionInvalidReason::Missing));
    assert_eq!(gate.check_session().reason, Some(SessionInvalidReason::Missing));
    assert_eq!(navigator.count(), 1);
}

#[test]
fn token_expiry_reads_exp_claim_without_signature_check() {
    let token = jwt_expiring_in(600);
    let expiry = token_expiry(&token).expect("exp claim");
    assert!(expiry > Utc::now());
    assert!(token_expiry("not-a-jwt").is_none());
}

#[test]
fn stale_generation_cannot_redirect_again_after_a_newer_one() {
    let (gate, _store, navigator) = gate_with(Some("token"));

    assert!(gate.redirect_once(1, SessionInvalidReason::Rejected));
    assert!(gate.redirect_once(2, SessionInvalidReason::Expired));
    assert!(!gate.redirect_once(1, SessionInvalidReason::Rejected));
    assert!(!gate.redirect_once(2, SessionInvalidReason::Rejected));

    assert_eq!(navigator.count(), 2);
}

#[test]
fn token_outside_leeway_is_still_valid() {
    let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
        jwt_expiring_in(600),
    )));
    let navigator = Arc::new(RecordingNavigator::default());
    let gate = SessionGate::new(store, navigator.clone(), "/login", Duration::seconds(120));

    assert!(gate.check_session().valid);
    assert_eq!(navigator.count(), 0);
}
