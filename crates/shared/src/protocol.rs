use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{ApplicationId, JobId, Role},
    error::TransitionError,
    status::{authorize_transition, Action, ApplicationStatus, StatusPresentation},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Either a bare id or a populated summary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Summary(ReferenceSummary),
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Summary(summary) => &summary.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Summary(summary) => summary
                .name
                .as_deref()
                .or(summary.title.as_deref())
                .unwrap_or(&summary.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(alias = "_id")]
    pub id: ApplicationId,
    pub student: Reference,
    pub job: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recruiter: Option<Reference>,
    /// Raw status as sent by the backend; see [`ApplicationRecord::status`].
    pub status: String,
    #[serde(default)]
    pub student_note: String,
    #[serde(default)]
    pub mentor_note: String,
    #[serde(default)]
    pub recruiter_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    pub fn status(&self) -> Option<ApplicationStatus> {
        ApplicationStatus::parse(&self.status)
    }

    pub fn presentation(&self) -> StatusPresentation {
        crate::status::presentation_for(&self.status)
    }

    /// Applies `action` as `role`. On error the record is left untouched.
    pub fn apply(&mut self, action: Action, role: Role) -> Result<ApplicationStatus, TransitionError> {
        let next = authorize_transition(&self.status, action, role)?;
        self.status = next.as_str().to_string();
        Ok(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorDecisionRequest {
    pub action: String,
    pub mentor_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterDecisionRequest {
    pub action: String,
    pub recruiter_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub student_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    #[serde(alias = "_id")]
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// `{success: false, message}` on an otherwise successful response.
pub fn envelope_rejection(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;
    if object.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or("Request was not successful");
    Some(message.to_string())
}

/// Locates the record list inside a payload: a bare array, `{<field>: [..]}`,
/// `{data: [..]}`, or the first array-valued field.
pub fn list_field<'a>(payload: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(object) => object
            .get(field)
            .or_else(|| object.get("data"))
            .and_then(Value::as_array)
            .or_else(|| object.values().find_map(Value::as_array)),
        _ => None,
    }
}

pub fn list_field_mut<'a>(payload: &'a mut Value, field: &str) -> Option<&'a mut Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(object) => {
            let key = if object.get(field).is_some_and(Value::is_array) {
                field.to_string()
            } else if object.get("data").is_some_and(Value::is_array) {
                "data".to_string()
            } else {
                object
                    .iter()
                    .find(|(_, value)| value.is_array())
                    .map(|(key, _)| key.clone())?
            };
            object.get_mut(&key).and_then(Value::as_array_mut)
        }
        _ => None,
    }
}

pub fn extract_list<T: DeserializeOwned>(
    payload: &Value,
    field: &str,
) -> Result<Vec<T>, serde_json::Error> {
    match list_field(payload, field) {
        Some(items) => items
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect(),
        None => Ok(Vec::new()),
    }
}

pub fn record_id(item: &Value) -> Option<&str> {
    item.get("_id")
        .or_else(|| item.get("id"))
        .and_then(Value::as_str)
}
