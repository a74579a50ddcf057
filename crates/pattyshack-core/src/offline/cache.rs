//! Last-known-good snapshot of the session's collections.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Message, Shift, Task, TemperatureLog};
use crate::storage::{quarantine_blob, KeyValueStore};

/// Tables whose rows the cache can serve while offline.
pub const CACHED_TABLES: [&str; 4] = ["tasks", "messages", "shifts", "temperature_logs"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachedSnapshot {
    pub tasks: Vec<Task>,
    pub messages: Vec<Message>,
    pub shifts: Vec<Shift>,
    pub temperature_logs: Vec<TemperatureLog>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl CachedSnapshot {
    /// Time since the last write, `None` if never synced.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_synced.map(|synced| now - synced)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
            && self.messages.is_empty()
            && self.shifts.is_empty()
            && self.temperature_logs.is_empty()
    }

    /// Cached rows of `table` as JSON, `None` for tables the cache never holds.
    pub fn rows_for(&self, table: &str) -> Result<Option<Vec<Value>>> {
        let rows = match table {
            "tasks" => to_rows(&self.tasks)?,
            "messages" => to_rows(&self.messages)?,
            "shifts" => to_rows(&self.shifts)?,
            "temperature_logs" => to_rows(&self.temperature_logs)?,
            _ => return Ok(None),
        };
        Ok(Some(rows))
    }
}

fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(Into::into))
        .collect()
}

/// Collections to replace; `None` leaves the cached collection as it is.
#[derive(Debug, Clone, Default)]
pub struct SnapshotUpdate {
    pub tasks: Option<Vec<Task>>,
    pub messages: Option<Vec<Message>>,
    pub shifts: Option<Vec<Shift>>,
    pub temperature_logs: Option<Vec<TemperatureLog>>,
}

impl SnapshotUpdate {
    #[must_use]
    pub fn tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    #[must_use]
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn shifts(mut self, shifts: Vec<Shift>) -> Self {
        self.shifts = Some(shifts);
        self
    }

    #[must_use]
    pub fn temperature_logs(mut self, logs: Vec<TemperatureLog>) -> Self {
        self.temperature_logs = Some(logs);
        self
    }
}

/// Persisted snapshot store. Writes are serialized by an internal mutex.
#[derive(Clone)]
pub struct OfflineCache<S: KeyValueStore> {
    store: S,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl<S: KeyValueStore> OfflineCache<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Replace the given collections wholesale and stamp `last_synced`.
    pub async fn cache(&self, update: SnapshotUpdate) -> Result<CachedSnapshot> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load().await?;

        if let Some(tasks) = update.tasks {
            snapshot.tasks = tasks;
        }
        if let Some(messages) = update.messages {
            snapshot.messages = messages;
        }
        if let Some(shifts) = update.shifts {
            snapshot.shifts = shifts;
        }
        if let Some(logs) = update.temperature_logs {
            snapshot.temperature_logs = logs;
        }
        snapshot.last_synced = Some(Utc::now());

        let raw = serde_json::to_string(&snapshot)?;
        self.store.set_item(&self.key, &raw).await?;
        tracing::debug!(
            tasks = snapshot.tasks.len(),
            messages = snapshot.messages.len(),
            shifts = snapshot.shifts.len(),
            temperature_logs = snapshot.temperature_logs.len(),
            "Updated offline cache"
        );
        Ok(snapshot)
    }

    /// The stored snapshot, or an empty one when nothing is cached.
    pub async fn read(&self) -> Result<CachedSnapshot> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store.remove_item(&self.key).await
    }

    async fn load(&self) -> Result<CachedSnapshot> {
        let Some(raw) = self.store.get_item(&self.key).await? else {
            return Ok(CachedSnapshot::default());
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(snapshot),
            Err(error) => {
                tracing::warn!("Offline cache at {} is unreadable: {}", self.key, error);
                quarantine_blob(&self.store, &self.key, &raw).await?;
                Ok(CachedSnapshot::default())
            }
        }
    }
}
