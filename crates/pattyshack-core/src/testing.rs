//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::connectivity::{ConnectivityMonitor, ManualProbe, NetworkState};
use crate::error::Result;
use crate::gateway::{GatewayError, GatewayResult, Query, RemoteGateway};
use crate::models::{Location, Message, Shift, Subtask, Task, User};
use crate::storage::{KeyValueStore, MemoryStore};

/// A monitor whose probe and latest value both start at `online`.
pub fn manual_monitor(online: bool) -> (ManualProbe, ConnectivityMonitor<ManualProbe>) {
    let state = if online {
        NetworkState::ONLINE
    } else {
        NetworkState::OFFLINE
    };
    let probe = ManualProbe::new(state);
    let monitor = ConnectivityMonitor::new(probe.clone());
    monitor.report(state);
    (probe, monitor)
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Insert { table: String, record: Value },
    Update { table: String, id: String, changes: Value },
    Delete { table: String, id: String },
    Select { table: String },
}

type CallPredicate = Arc<dyn Fn(&GatewayCall) -> bool + Send + Sync>;

#[derive(Default)]
struct Recorded {
    calls: Vec<GatewayCall>,
    inserted: usize,
}

/// Gateway that records every call and answers from canned data.
///
/// Inserts without an `id` get `srv-<n>`, counting successful inserts.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    recorded: Arc<Mutex<Recorded>>,
    rows: Arc<HashMap<String, Vec<Value>>>,
    fail: Option<CallPredicate>,
    hang: Option<CallPredicate>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching calls fail with a 423 "record locked" API error.
    pub fn fail_when(
        mut self,
        predicate: impl Fn(&GatewayCall) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail = Some(Arc::new(predicate));
        self
    }

    /// Matching calls never complete.
    pub fn hang_when(
        mut self,
        predicate: impl Fn(&GatewayCall) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.hang = Some(Arc::new(predicate));
        self
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        let mut all = (*self.rows).clone();
        all.insert(table.to_string(), rows);
        self.rows = Arc::new(all);
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.recorded.lock().unwrap().calls.clone()
    }

    async fn record(&self, call: GatewayCall) -> GatewayResult<()> {
        self.recorded.lock().unwrap().calls.push(call.clone());
        if self.hang.as_ref().is_some_and(|hang| hang(&call)) {
            std::future::pending::<()>().await;
        }
        if self.fail.as_ref().is_some_and(|fail| fail(&call)) {
            return Err(GatewayError::Api {
                status: 423,
                message: "record locked".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteGateway for RecordingGateway {
    async fn insert(&self, table: &str, record: &Value) -> GatewayResult<Value> {
        self.record(GatewayCall::Insert {
            table: table.to_string(),
            record: record.clone(),
        })
        .await?;

        let mut row = record.clone();
        let mut recorded = self.recorded.lock().unwrap();
        recorded.inserted += 1;
        if let Value::Object(fields) = &mut row {
            fields
                .entry("id")
                .or_insert_with(|| Value::String(format!("srv-{}", recorded.inserted)));
        }
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, changes: &Value) -> GatewayResult<Value> {
        self.record(GatewayCall::Update {
            table: table.to_string(),
            id: id.to_string(),
            changes: changes.clone(),
        })
        .await?;

        let mut row = json!({ "id": id });
        if let (Value::Object(row), Value::Object(changes)) = (&mut row, changes) {
            row.extend(changes.clone());
        }
        Ok(row)
    }

    async fn delete(&self, table: &str, id: &str) -> GatewayResult<Value> {
        self.record(GatewayCall::Delete {
            table: table.to_string(),
            id: id.to_string(),
        })
        .await?;
        Ok(Value::Null)
    }

    async fn select(&self, query: &Query) -> GatewayResult<Vec<Value>> {
        self.record(GatewayCall::Select {
            table: query.table.clone(),
        })
        .await?;
        Ok(self.rows.get(&query.table).cloned().unwrap_or_default())
    }
}

/// Memory store that yields before every operation, so concurrent callers
/// interleave at each await point.
#[derive(Debug, Clone, Default)]
pub struct YieldingStore {
    inner: MemoryStore,
}

impl YieldingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for YieldingStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.remove_item(key).await
    }
}

pub fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn sample_user() -> User {
    serde_json::from_value(json!({
        "id": "u1",
        "email": "cook@pattyshack.test",
        "name": "Sam",
        "role": "crew",
        "location_id": "loc-1",
        "created_at": "2024-03-01T08:00:00Z"
    }))
    .unwrap()
}

pub fn sample_location() -> Location {
    Location {
        id: "loc-1".to_string(),
        name: "Pattyshack Downtown".to_string(),
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        phone: None,
        manager_id: None,
    }
}

pub fn sample_task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        title: "Close grill".to_string(),
        description: None,
        task_type: crate::models::TaskType::Closing,
        location_id: "loc-1".to_string(),
        date: sample_date(),
        shift_start: "14:00".to_string(),
        shift_end: "22:00".to_string(),
        assigned_to: "u1".to_string(),
        assigned_user: None,
        subtasks: vec![Subtask {
            id: format!("{id}-s1"),
            task_id: id.to_string(),
            text: "Scrape the flat top".to_string(),
            completed: false,
            completed_at: None,
            completed_by: None,
            order: 1,
        }],
        status: crate::models::TaskStatus::Pending,
        completed_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    }
}

pub fn sample_message(id: &str) -> Message {
    Message {
        id: id.to_string(),
        sender_id: "u2".to_string(),
        sender: None,
        recipient_id: Some("u1".to_string()),
        location_id: None,
        subject: "Truck delivery".to_string(),
        body: "Produce arrives at 7".to_string(),
        is_read: false,
        priority: crate::models::MessagePriority::Normal,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap(),
    }
}

pub fn sample_shift(id: &str) -> Shift {
    Shift {
        id: id.to_string(),
        user_id: "u1".to_string(),
        user: None,
        location_id: "loc-1".to_string(),
        date: sample_date(),
        start_time: "14:00".to_string(),
        end_time: "22:00".to_string(),
        position: "grill".to_string(),
        notes: None,
        clock_in: None,
        clock_out: None,
    }
}
