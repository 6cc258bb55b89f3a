use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    controller::DataFetchController,
    descriptor::{RequestDescriptor, ResourceKey},
    outcome::{FetchOutcome, ViewError},
};

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    data: HashMap<ResourceKey, Value>,
    errors: HashMap<ResourceKey, ViewError>,
    latest_seq: HashMap<ResourceKey, u64>,
    /// Keys whose newest request is still unresolved.
    pending: HashSet<ResourceKey>,
    /// Issued requests of any key that have not resolved yet.
    outstanding: usize,
    /// Bumped each time a successful fetch replaces `data[key]`.
    refreshes: HashMap<ResourceKey, u64>,
}

impl ViewState {
    pub fn data(&self, key: &ResourceKey) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn error(&self, key: &ResourceKey) -> Option<&ViewError> {
        self.errors.get(key)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&ResourceKey, &ViewError)> {
        self.errors.iter()
    }

    pub fn is_loading(&self) -> bool {
        self.outstanding > 0
    }

    pub fn is_loading_key(&self, key: &ResourceKey) -> bool {
        self.pending.contains(key)
    }

    pub fn records<T: DeserializeOwned>(
        &self,
        key: &ResourceKey,
        field: &str,
    ) -> Result<Vec<T>, serde_json::Error> {
        match self.data.get(key) {
            Some(payload) => shared::protocol::extract_list(payload, field),
            None => Ok(Vec::new()),
        }
    }

    pub fn clear_error(&mut self, key: &ResourceKey) {
        self.errors.remove(key);
    }

    pub(crate) fn refresh_count(&self, key: &ResourceKey) -> u64 {
        self.refreshes.get(key).copied().unwrap_or_default()
    }

    pub(crate) fn data_mut(&mut self, key: &ResourceKey) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    fn begin(&mut self, key: &ResourceKey) -> u64 {
        let seq = self.latest_seq.entry(key.clone()).or_default();
        *seq += 1;
        self.pending.insert(key.clone());
        self.outstanding += 1;
        *seq
    }

    /// Returns whether the outcome was merged.
    fn complete(&mut self, key: &ResourceKey, seq: u64, outcome: &FetchOutcome) -> bool {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.latest_seq.get(key) != Some(&seq) {
            return false;
        }
        self.pending.remove(key);

        match outcome {
            FetchOutcome::Success { payload } => {
                self.data.insert(key.clone(), payload.clone());
                *self.refreshes.entry(key.clone()).or_default() += 1;
                self.errors.remove(key);
            }
            failure => {
                if let Some(error) = failure.failure() {
                    self.errors.insert(key.clone(), error);
                }
            }
        }
        true
    }

    fn abandon(&mut self, key: &ResourceKey, seq: u64) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.latest_seq.get(key) == Some(&seq) {
            self.pending.remove(key);
        }
    }
}

pub struct View {
    id: Uuid,
    name: String,
    controller: Arc<DataFetchController>,
    state: Mutex<ViewState>,
}

impl View {
    pub(crate) fn new(controller: Arc<DataFetchController>, name: String) -> Self {
        let id = Uuid::new_v4();
        debug!(view = %name, %id, "view mounted");
        Self {
            id,
            name,
            controller,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controller(&self) -> &Arc<DataFetchController> {
        &self.controller
    }

    // Merged only if no newer request for the key was issued meanwhile.
    pub async fn fetch(&self, descriptor: RequestDescriptor) -> FetchOutcome {
        let key = descriptor.key().clone();
        let seq = self.with_state_mut(|state| state.begin(&key));
        let mut in_flight = InFlight {
            view: self,
            key: &key,
            seq,
            resolved: false,
        };

        let outcome = self.controller.execute(&descriptor).await;

        in_flight.resolved = true;
        let merged = self.with_state_mut(|state| state.complete(&key, seq, &outcome));
        if !merged {
            debug!(view = %self.name, key = %key, seq, "discarded superseded response");
        }
        outcome
    }

    pub async fn fetch_all(&self, descriptors: Vec<RequestDescriptor>) -> Vec<FetchOutcome> {
        join_all(descriptors.into_iter().map(|descriptor| self.fetch(descriptor))).await
    }

    pub fn state(&self) -> ViewState {
        self.with_state(Clone::clone)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn data(&self, key: &ResourceKey) -> Option<Value> {
        self.with_state(|state| state.data(key).cloned())
    }

    pub fn error(&self, key: &ResourceKey) -> Option<ViewError> {
        self.with_state(|state| state.error(key).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(ViewState::is_loading)
    }

    pub fn clear_error(&self, key: &ResourceKey) {
        self.with_state_mut(|state| state.clear_error(key));
    }
}

impl Drop for View {
    fn drop(&mut self) {
        debug!(view = %self.name, id = %self.id, "view unmounted");
    }
}

/// Releases the loading flag if a `fetch` future is dropped before its
/// outcome arrives.
struct InFlight<'a> {
    view: &'a View,
    key: &'a ResourceKey,
    seq: u64,
    resolved: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.view
                .with_state_mut(|state| state.abandon(self.key, self.seq));
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
