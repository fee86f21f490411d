/// Wire types for the task service's `/terminal/*` endpoints.
///
/// Every endpoint takes a JSON POST body and answers with the same envelope:
/// `{"status": "success"|"error", "message"?: str, "result"?: str}`.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::command::{self, Handler};
use crate::form::TaskFormValues;

// ── Requests ──────────────────────────────────────────────────────────────────

pub const LIST_ENDPOINT: &str = "/terminal/list";
pub const VIEW_ENDPOINT: &str = "/terminal/view";
pub const ADD_ENDPOINT: &str = "/terminal/add";
pub const EDIT_ENDPOINT: &str = "/terminal/edit";
pub const DELETE_ENDPOINT: &str = "/terminal/delete";

/// The token the user typed to pick a task. Sent through as-is; the service
/// does its own validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    /// Body is the raw argument string, JSON-encoded as a string
    List { args: String },
    View { task_id: TaskId },
    Add(TaskFormValues),
    Edit { task_id: TaskId, values: TaskFormValues },
    Delete { task_id: TaskId },
}

#[derive(Serialize)]
struct TargetBody<'a> {
    task_id: &'a TaskId,
}

#[derive(Serialize)]
struct EditBody<'a> {
    task_id: &'a TaskId,
    #[serde(flatten)]
    values: &'a TaskFormValues,
}

impl TaskRequest {
    /// The command this request is issued for.
    pub fn command_name(&self) -> &'static str {
        match self {
            TaskRequest::List { .. } => "list",
            TaskRequest::View { .. } => "view",
            TaskRequest::Add(_) => "add",
            TaskRequest::Edit { .. } => "edit",
            TaskRequest::Delete { .. } => "delete",
        }
    }

    /// Endpoint path, taken from the command table. `None` if the table
    /// has no remote handler for this command.
    pub fn endpoint(&self) -> Option<&'static str> {
        match command::lookup(self.command_name())?.handler {
            Handler::Remote(endpoint) => Some(endpoint),
            Handler::Local => None,
        }
    }

    pub fn body(&self) -> Value {
        let body = match self {
            TaskRequest::List { args } => Ok(Value::String(args.clone())),
            TaskRequest::View { task_id } | TaskRequest::Delete { task_id } => {
                serde_json::to_value(TargetBody { task_id })
            }
            TaskRequest::Add(values) => serde_json::to_value(values),
            TaskRequest::Edit { task_id, values } => {
                serde_json::to_value(EditBody { task_id, values })
            }
        };
        // All bodies are plain string maps; serialization cannot fail.
        body.unwrap_or(Value::Null)
    }
}

// ── Response envelope ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerResponse {
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub result: Option<String>,
}

impl ServerResponse {
    /// Client-side failure (network, bad body) in the service's own shape.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    pub fn result_text(&self) -> &str {
        self.result.as_deref().unwrap_or("")
    }
}

// ── Task record ───────────────────────────────────────────────────────────────

/// Decode the JSON task record carried in a `view` result into form defaults.
/// Unknown keys (`id`, `user_id`, ...) are ignored.
pub fn decode_task_record(raw: &str) -> Result<TaskFormValues, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Accept a string, number, bool or null and keep it as text.
/// The service stores `importance` and `est_time_days` as integers.
pub fn lenient_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> TaskId {
        TaskId(s.to_string())
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(TaskRequest::List { args: String::new() }.endpoint(), Some("/terminal/list"));
        assert_eq!(TaskRequest::View { task_id: id("1") }.endpoint(), Some("/terminal/view"));
        assert_eq!(TaskRequest::Add(TaskFormValues::default()).endpoint(), Some("/terminal/add"));
        assert_eq!(
            TaskRequest::Edit { task_id: id("1"), values: TaskFormValues::default() }.endpoint(),
            Some("/terminal/edit")
        );
        assert_eq!(TaskRequest::Delete { task_id: id("1") }.endpoint(), Some("/terminal/delete"));
    }

    #[test]
    fn test_list_body_is_raw_string() {
        let req = TaskRequest::List { args: "due soon".to_string() };
        assert_eq!(req.body(), json!("due soon"));
    }

    #[test]
    fn test_target_body() {
        assert_eq!(TaskRequest::View { task_id: id("42") }.body(), json!({"task_id": "42"}));
        assert_eq!(TaskRequest::Delete { task_id: id("x") }.body(), json!({"task_id": "x"}));
    }

    #[test]
    fn test_edit_body_merges_task_id_into_values() {
        let values = TaskFormValues {
            title: Some("Write report".to_string()),
            importance: Some("3".to_string()),
            ..Default::default()
        };
        let body = TaskRequest::Edit { task_id: id("7"), values }.body();
        assert_eq!(body, json!({"task_id": "7", "title": "Write report", "importance": "3"}));
    }

    #[test]
    fn test_envelope_decode() {
        let ok: ServerResponse =
            serde_json::from_str(r#"{"status":"success","result":"added"}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.result_text(), "added");
        assert_eq!(ok.message, None);

        let err: ServerResponse =
            serde_json::from_str(r#"{"status":"error","message":"not found"}"#).unwrap();
        assert!(!err.is_success());
        assert_eq!(err.message_text(), "not found");
    }

    #[test]
    fn test_envelope_keeps_non_string_result_as_json_text() {
        let r: ServerResponse =
            serde_json::from_str(r#"{"status":"success","result":{"id":1},"message":null}"#)
                .unwrap();
        assert_eq!(r.result.as_deref(), Some(r#"{"id":1}"#));
        assert_eq!(r.message, None);
    }

    #[test]
    fn test_envelope_rejects_unknown_status() {
        assert!(serde_json::from_str::<ServerResponse>(r#"{"status":"maybe"}"#).is_err());
    }

    #[test]
    fn test_decode_task_record_is_lenient() {
        let raw = r#"{"id": 7, "title": "Write report", "importance": 3,
                      "deadline": "2025-06-01", "est_time_days": null,
                      "description": "Q2 numbers", "user_id": 1}"#;
        let values = decode_task_record(raw).unwrap();
        assert_eq!(values.title.as_deref(), Some("Write report"));
        assert_eq!(values.importance.as_deref(), Some("3"));
        assert_eq!(values.deadline.as_deref(), Some("2025-06-01"));
        assert_eq!(values.est_time_days, None);
        assert_eq!(values.description.as_deref(), Some("Q2 numbers"));
    }

    #[test]
    fn test_decode_task_record_rejects_non_object() {
        assert!(decode_task_record("view command has been received").is_err());
        assert!(decode_task_record("[1, 2]").is_err());
    }
}
