use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use shared::{
    domain::{ApplicationId, Role},
    error::TransitionError,
    protocol::{list_field_mut, record_id},
    status::{authorize_transition, Action, ApplicationStatus},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    descriptor::ResourceKey,
    error::ClientError,
    outcome::{FetchOutcome, ViewError},
    resources::{self, APPLICATIONS_FIELD},
    view::View,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub note: String,
    pub interview_date: Option<DateTime<Utc>>,
}

impl Decision {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            note: String::new(),
            interview_date: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.interview_date = Some(at);
        self
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("application {0} is not loaded in this view")]
    NotCached(ApplicationId),
    #[error("an interview date is required to schedule an interview")]
    MissingInterviewDate,
    #[error("{0}")]
    Rejected(ViewError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

const DECISION_FIELDS: [&str; 6] = [
    "status",
    "studentNote",
    "mentorNote",
    "recruiterNote",
    "interviewDate",
    "updatedAt",
];

struct OptimisticWrite {
    previous_status: Value,
    next: ApplicationStatus,
    refreshes: u64,
}

/// Applies `decision` to the application `application_id` cached under `key`:
/// the status changes in the cache first and is restored if the request
/// fails, unless a fetch has replaced the cached resource since.
pub async fn perform(
    view: &View,
    key: &ResourceKey,
    application_id: &ApplicationId,
    decision: &Decision,
    role: Role,
) -> Result<ApplicationStatus, ActionError> {
    if let Err(reason) = view.controller().gate().authorize() {
        return Err(ActionError::Rejected(ViewError::Session(reason.into())));
    }
    if decision.action == Action::ScheduleInterview && decision.interview_date.is_none() {
        return Err(ActionError::MissingInterviewDate);
    }
    let descriptor = resources::decision(application_id, decision)?;

    let write = view.with_state_mut(|state| -> Result<OptimisticWrite, ActionError> {
        let current_status = state
            .data(key)
            .and_then(|payload| find_record(payload, application_id))
            .map(status_of)
            .ok_or_else(|| ActionError::NotCached(application_id.clone()))?;
        let next = authorize_transition(&current_status, decision.action, role)?;

        let payload = state
            .data_mut(key)
            .ok_or_else(|| ActionError::NotCached(application_id.clone()))?;
        let record = find_record_mut(payload, application_id)
            .ok_or_else(|| ActionError::NotCached(application_id.clone()))?;
        let previous_status = set_status(record, Value::String(next.as_str().to_string()));
        Ok(OptimisticWrite {
            previous_status,
            next,
            refreshes: state.refresh_count(key),
        })
    })?;

    info!(
        view = view.name(),
        application = %application_id,
        action = %decision.action,
        next = %write.next,
        "applied decision optimistically"
    );

    match view.fetch(descriptor).await {
        FetchOutcome::Success { payload } => {
            let confirmed = decision_fields(&payload, application_id);
            let status = confirmed
                .as_ref()
                .and_then(|fields| fields.get("status"))
                .and_then(Value::as_str)
                .and_then(ApplicationStatus::parse)
                .unwrap_or(write.next);
            if let Some(fields) = confirmed {
                reconcile(view, key, application_id, write.refreshes, fields);
            }
            Ok(status)
        }
        outcome => {
            rollback(view, key, application_id, &write);
            let error = outcome
                .failure()
                .unwrap_or_else(|| ViewError::Validation("request failed".to_string()));
            Err(ActionError::Rejected(error))
        }
    }
}

fn rollback(view: &View, key: &ResourceKey, application_id: &ApplicationId, write: &OptimisticWrite) {
    view.with_state_mut(|state| {
        if state.refresh_count(key) != write.refreshes {
            info!(
                application = %application_id,
                "cache refreshed since decision; skipping rollback"
            );
            return;
        }
        let Some(record) = state
            .data_mut(key)
            .and_then(|payload| find_record_mut(payload, application_id))
        else {
            return;
        };
        if status_of(record) != write.next.as_str() {
            info!(application = %application_id, "status moved on since decision; skipping rollback");
            return;
        }
        set_status(record, write.previous_status.clone());
        warn!(application = %application_id, "decision failed; restored previous status");
    });
}

fn reconcile(
    view: &View,
    key: &ResourceKey,
    application_id: &ApplicationId,
    refreshes: u64,
    fields: Map<String, Value>,
) {
    view.with_state_mut(|state| {
        if state.refresh_count(key) != refreshes {
            return;
        }
        let Some(object) = state
            .data_mut(key)
            .and_then(|payload| find_record_mut(payload, application_id))
            .and_then(Value::as_object_mut)
        else {
            return;
        };
        object.extend(fields);
    });
}

/// Decision endpoints answer with the bare record or `{application}`; refs in
/// it are usually unpopulated, so only [`DECISION_FIELDS`] are taken.
fn decision_fields(payload: &Value, application_id: &ApplicationId) -> Option<Map<String, Value>> {
    let candidate = payload.get("application").unwrap_or(payload);
    let object = candidate.as_object()?;
    if record_id(candidate).is_some_and(|id| id != application_id.as_str()) {
        return None;
    }
    let fields: Map<String, Value> = DECISION_FIELDS
        .iter()
        .filter_map(|name| {
            object
                .get(*name)
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect();
    (!fields.is_empty()).then_some(fields)
}

fn status_of(record: &Value) -> String {
    record
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn set_status(record: &mut Value, status: Value) -> Value {
    match record.as_object_mut() {
        Some(object) => object.insert("status".to_string(), status).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn find_record<'a>(payload: &'a Value, application_id: &ApplicationId) -> Option<&'a Value> {
    if record_id(payload) == Some(application_id.as_str()) {
        return Some(payload);
    }
    shared::protocol::list_field(payload, APPLICATIONS_FIELD)?
        .iter()
        .find(|item| record_id(item) == Some(application_id.as_str()))
}

fn find_record_mut<'a>(
    payload: &'a mut Value,
    application_id: &ApplicationId,
) -> Option<&'a mut Value> {
    if record_id(payload) == Some(application_id.as_str()) {
        return Some(payload);
    }
    list_field_mut(payload, APPLICATIONS_FIELD)?
        .iter_mut()
        .find(|item| record_id(item) == Some(application_id.as_str()))
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
