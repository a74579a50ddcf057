//! Queued mutation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::util::{collect_string_values, contains_string_value, replace_string_values};

/// Prefix marking ids generated locally for records created offline.
pub const PLACEHOLDER_PREFIX: &str = "offline_";

/// Generate a fresh placeholder id (`offline_<uuid v7>`).
pub fn placeholder_id() -> String {
    format!("{PLACEHOLDER_PREFIX}{}", Uuid::now_v7())
}

/// `offline_` followed by an id token; free text that merely starts with the
/// prefix does not count.
pub fn is_placeholder_id(id: &str) -> bool {
    id.strip_prefix(PLACEHOLDER_PREFIX).is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Insert,
    Update,
    Delete,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A mutation about to be queued; the queue assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub kind: ActionKind,
    pub table: String,
    pub data: Value,
    pub placeholder_id: Option<String>,
}

impl NewAction {
    /// Insert of a full record.
    pub fn insert(table: impl Into<String>, record: Value) -> Self {
        Self {
            kind: ActionKind::Insert,
            table: table.into(),
            data: record,
            placeholder_id: None,
        }
    }

    /// Partial update, stored as `{id, updates}`.
    pub fn update(table: impl Into<String>, id: &str, updates: Value) -> Self {
        Self {
            kind: ActionKind::Update,
            table: table.into(),
            data: json!({ "id": id, "updates": updates }),
            placeholder_id: None,
        }
    }

    /// Delete by id, stored as `{id}`.
    pub fn delete(table: impl Into<String>, id: &str) -> Self {
        Self {
            kind: ActionKind::Delete,
            table: table.into(),
            data: json!({ "id": id }),
            placeholder_id: None,
        }
    }

    /// Remember the id handed to the caller for an offline insert.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder_id: impl Into<String>) -> Self {
        self.placeholder_id = Some(placeholder_id.into());
        self
    }
}

/// One pending mutation, persisted in enqueue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// UUID v7, so ids sort by enqueue time
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub table: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    /// Failed replays so far
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_id: Option<String>,
}

impl QueuedAction {
    pub(crate) fn from_new(action: NewAction) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind: action.kind,
            table: action.table,
            data: action.data,
            timestamp: Utc::now(),
            attempts: 0,
            last_error: None,
            placeholder_id: action.placeholder_id,
        }
    }

    /// The record id the payload names, if any.
    pub fn target_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    /// The partial record of an update.
    pub fn updates(&self) -> Option<&Value> {
        match self.kind {
            ActionKind::Update => self.data.get("updates"),
            ActionKind::Insert | ActionKind::Delete => None,
        }
    }

    /// Whether any value in the payload equals `id`.
    pub fn references(&self, id: &str) -> bool {
        contains_string_value(&self.data, id)
    }

    /// Placeholder ids of other offline records the payload points at.
    pub fn placeholder_refs(&self) -> Vec<&str> {
        let mut found = Vec::new();
        collect_string_values(&self.data, &is_placeholder_id, &mut found);
        found.retain(|id| Some(*id) != self.placeholder_id.as_deref());
        found.dedup();
        found
    }

    /// Rewrite every payload value equal to `from`; returns the count.
    pub fn replace_id(&mut self, from: &str, to: &str) -> usize {
        replace_string_values(&mut self.data, from, to)
    }

    pub(crate) fn record_failure(&mut self, error: impl Into<String>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.into());
    }
}

/// Placeholder id resolved to the id the server assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub placeholder: String,
    pub server_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_ids_are_unique_and_prefixed() {
        let first = placeholder_id();
        let second = placeholder_id();
        assert_ne!(first, second);
        assert!(is_placeholder_id(&first));
        assert!(!is_placeholder_id("8c7b0a3e"));
        assert!(!is_placeholder_id("offline_1 stays"));
        assert!(!is_placeholder_id("offline_"));
    }

    #[test]
    fn update_payload_keeps_id_and_updates() {
        let action = QueuedAction::from_new(NewAction::update(
            "messages",
            "m1",
            json!({ "is_read": true }),
        ));
        assert_eq!(action.target_id(), Some("m1"));
        assert_eq!(action.updates(), Some(&json!({ "is_read": true })));
        assert_eq!(action.attempts, 0);
    }

    #[test]
    fn placeholder_refs_skip_the_action_own_placeholder() {
        let insert = QueuedAction::from_new(
            NewAction::insert(
                "subtasks",
                json!({ "id": "offline_c", "task_id": "offline_a", "text": "Scrape" }),
            )
            .with_placeholder("offline_c"),
        );
        assert_eq!(insert.placeholder_refs(), vec!["offline_a"]);

        let update = QueuedAction::from_new(NewAction::update("tasks", "t1", json!({})));
        assert!(update.placeholder_refs().is_empty());
    }

    #[test]
    fn serialized_shape_matches_stored_blob() {
        let action = QueuedAction::from_new(NewAction::delete("tasks", "t1"));
        let value = serde_json::to_value(&action).unwrap();

        assert_eq!(value["type"], "delete");
        assert_eq!(value["table"], "tasks");
        assert_eq!(value["data"], json!({ "id": "t1" }));
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(value.get("last_error").is_none());
    }

    #[test]
    fn older_blobs_without_retry_fields_still_parse() {
        let action: QueuedAction = serde_json::from_str(
            r#"{
                "id": "1709280000000_k3j2h1g0f",
                "type": "insert",
                "table": "tasks",
                "data": {"title": "Close grill"},
                "timestamp": "2024-03-01T08:00:00.000Z"
            }"#,
        )
        .unwrap();
        assert_eq!(action.kind, ActionKind::Insert);
        assert_eq!(action.attempts, 0);
        assert!(action.placeholder_id.is_none());
    }
}
