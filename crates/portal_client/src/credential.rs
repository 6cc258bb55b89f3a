use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use zeroize::Zeroizing;

/// Opaque bearer token. The backing memory is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    pub credential: Option<Credential>,
    /// Bumped on every install and every explicit clear.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The credential of that generation was current and is now gone.
    Cleared,
    /// Same generation, but somebody already cleared it.
    AlreadyCleared,
    /// A newer credential was installed since; nothing was touched.
    Superseded,
}

pub trait CredentialStore: Send + Sync {
    fn snapshot(&self) -> CredentialSnapshot;
    fn install(&self, credential: Credential) -> u64;
    fn clear(&self) -> u64;
    fn clear_if(&self, generation: u64) -> ClearOutcome;
}

#[derive(Default)]
struct Slot {
    credential: Option<Credential>,
    generation: u64,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Slot>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::default();
        store.install(credential);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn snapshot(&self) -> CredentialSnapshot {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        CredentialSnapshot {
            credential: slot.credential.clone(),
            generation: slot.generation,
        }
    }

    fn install(&self, credential: Credential) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.credential = Some(credential);
        slot.generation
    }

    fn clear(&self) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.credential = None;
        slot.generation
    }

    fn clear_if(&self, generation: u64) -> ClearOutcome {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation {
            return ClearOutcome::Superseded;
        }
        match slot.credential.take() {
            Some(_) => ClearOutcome::Cleared,
            None => ClearOutcome::AlreadyCleared,
        }
    }
}
