//! Task and checklist models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Which part of the day a checklist belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    Opening,
    Closing,
    MidShift,
    Custom,
}

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A checklist assigned to a crew member for one shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub location_id: String,
    pub date: NaiveDate,
    pub shift_start: String,
    pub shift_end: String,
    pub assigned_to: String,
    /// Embedded `users!assigned_to` row, when the query asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<User>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|subtask| subtask.id == subtask_id)
    }

    pub fn subtask_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
    }

    /// Fraction of subtasks completed, 0.0 for an empty checklist.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return 0.0;
        }
        let done = self.subtasks.iter().filter(|subtask| subtask.completed).count();
        done as f64 / self.subtasks.len() as f64
    }
}

/// One line item of a checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    pub order: i32,
}

impl Subtask {
    /// Flip completion, stamping or clearing who completed it and when.
    pub fn toggle(&mut self, user_id: &str, at: DateTime<Utc>) {
        self.completed = !self.completed;
        if self.completed {
            self.completed_at = Some(at);
            self.completed_by = Some(user_id.to_string());
        } else {
            self.completed_at = None;
            self.completed_by = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        serde_json::from_str(
            r#"{
                "id": "t1",
                "title": "Close grill",
                "type": "mid-shift",
                "location_id": "loc-1",
                "date": "2024-03-01",
                "shift_start": "14:00",
                "shift_end": "22:00",
                "assigned_to": "u1",
                "status": "in_progress",
                "created_at": "2024-03-01T08:00:00Z",
                "subtasks": [
                    {"id": "s1", "task_id": "t1", "text": "Scrape", "completed": true, "order": 1},
                    {"id": "s2", "task_id": "t1", "text": "Oil", "completed": false, "order": 2}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn task_parses_kebab_type_and_snake_status() {
        let task = sample_task();
        assert_eq!(task.task_type, TaskType::MidShift);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!((task.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn toggle_stamps_and_clears_completion() {
        let mut task = sample_task();
        let now = Utc::now();
        let subtask = task.subtask_mut("s2").unwrap();

        subtask.toggle("u1", now);
        assert!(subtask.completed);
        assert_eq!(subtask.completed_by.as_deref(), Some("u1"));
        assert_eq!(subtask.completed_at, Some(now));

        subtask.toggle("u1", now);
        assert!(!subtask.completed);
        assert!(subtask.completed_by.is_none());
        assert!(subtask.completed_at.is_none());
    }
}
