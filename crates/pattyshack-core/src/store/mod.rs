//! Application state store.
//!
//! A constructed container over the offline facade. State lives in a
//! `tokio::sync::watch` channel so UI layers can subscribe to snapshots.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::connectivity::NetworkProbe;
use crate::error::{Error, Result};
use crate::gateway::{Filter, Query, RemoteGateway};
use crate::models::{
    DashboardStats, Location, Message, Shift, Subtask, Task, TaskStatus, TemperatureLog, User,
};
use crate::offline::{
    DrainReport, Fetched, IdMapping, OfflineOperations, SnapshotUpdate, Source,
};
use crate::state::SyncState;
use crate::storage::KeyValueStore;
use crate::util::{iso_timestamp, replace_string_values};

const TASK_COLUMNS: &str = "*, subtasks (*), assigned_user:users!assigned_to (*)";
const MESSAGE_COLUMNS: &str = "*, sender:users!sender_id (*)";
const SHIFT_COLUMNS: &str = "*, user:users!user_id (*)";
const MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub current_location: Option<Location>,
    pub locations: Vec<Location>,
    /// Day the task and shift lists were fetched for
    pub selected_date: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub messages: Vec<Message>,
    pub shifts: Vec<Shift>,
    pub stats: Option<DashboardStats>,
    pub pending_changes: usize,
    pub dead_lettered: usize,
    pub is_online: bool,
    pub sync_state: SyncState,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            current_location: None,
            locations: Vec::new(),
            selected_date: None,
            tasks: Vec::new(),
            messages: Vec::new(),
            shifts: Vec::new(),
            stats: None,
            pending_changes: 0,
            dead_lettered: 0,
            is_online: true,
            sync_state: SyncState::Synced,
        }
    }
}

#[derive(Clone)]
pub struct AppStore<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    operations: OfflineOperations<G, S, P>,
    state: Arc<watch::Sender<AppState>>,
}

impl<G, S, P> AppStore<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    pub fn new(operations: OfflineOperations<G, S, P>) -> Self {
        let (state, _) = watch::channel(AppState::default());
        Self {
            operations,
            state: Arc::new(state),
        }
    }

    pub const fn operations(&self) -> &OfflineOperations<G, S, P> {
        &self.operations
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|state| {
            state.is_authenticated = user.is_some();
            state.user = user;
        });
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.state.send_modify(|state| state.is_loading = is_loading);
    }

    pub fn set_current_location(&self, location: Option<Location>) {
        self.state
            .send_modify(|state| state.current_location = location);
    }

    pub fn set_locations(&self, locations: Vec<Location>) {
        self.state.send_modify(|state| state.locations = locations);
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.state.send_modify(|state| state.tasks = tasks);
    }

    pub fn set_messages(&self, messages: Vec<Message>) {
        self.state.send_modify(|state| state.messages = messages);
    }

    pub fn set_shifts(&self, shifts: Vec<Shift>) {
        self.state.send_modify(|state| state.shifts = shifts);
    }

    pub fn set_stats(&self, stats: Option<DashboardStats>) {
        self.state.send_modify(|state| state.stats = stats);
    }

    /// Load the location's tasks for `date`, earliest shift first.
    pub async fn fetch_tasks(&self, date: NaiveDate) -> Result<()> {
        let (user, location) = self.session();
        let (Some(_), Some(location)) = (user, location) else {
            return Ok(());
        };

        let query = Query::table("tasks")
            .select(TASK_COLUMNS)
            .eq("location_id", &location.id)
            .eq("date", date)
            .order("shift_start", true);
        let fetched = self.operations.select(&query).await?;
        let source = fetched.source;
        let tasks: Vec<Task> = parse_rows(fetched.rows)?;

        if source == Source::Remote {
            self.operations
                .cache()
                .cache(SnapshotUpdate::default().tasks(tasks.clone()))
                .await?;
        }
        self.state.send_modify(|state| {
            state.selected_date = Some(date);
            state.tasks = tasks;
        });
        Ok(())
    }

    /// Load the newest messages addressed to the user or their location.
    pub async fn fetch_messages(&self) -> Result<()> {
        let (user, location) = self.session();
        let Some(user) = user else {
            return Ok(());
        };

        let query = Query::table("messages")
            .select(MESSAGE_COLUMNS)
            .order("created_at", false)
            .limit(MESSAGE_LIMIT);
        let query = with_audience(query, &user, location.as_ref());
        let fetched = self.operations.select(&query).await?;
        let source = fetched.source;
        let messages: Vec<Message> = parse_rows(fetched.rows)?;

        if source == Source::Remote {
            self.operations
                .cache()
                .cache(SnapshotUpdate::default().messages(messages.clone()))
                .await?;
        }
        self.state.send_modify(|state| state.messages = messages);
        Ok(())
    }

    /// Load the location's shifts for `date`, earliest first.
    pub async fn fetch_shifts(&self, date: NaiveDate) -> Result<()> {
        let (_, location) = self.session();
        let Some(location) = location else {
            return Ok(());
        };

        let query = Query::table("shifts")
            .select(SHIFT_COLUMNS)
            .eq("location_id", &location.id)
            .eq("date", date)
            .order("start_time", true);
        let fetched = self.operations.select(&query).await?;
        let source = fetched.source;
        let shifts: Vec<Shift> = parse_rows(fetched.rows)?;

        if source == Source::Remote {
            self.operations
                .cache()
                .cache(SnapshotUpdate::default().shifts(shifts.clone()))
                .await?;
        }
        self.state.send_modify(|state| {
            state.selected_date = Some(date);
            state.shifts = shifts;
        });
        Ok(())
    }

    /// Recompute today's dashboard counters.
    pub async fn fetch_stats(&self) -> Result<()> {
        let (user, location) = self.session();
        let (Some(user), Some(location)) = (user, location) else {
            return Ok(());
        };
        let today = Utc::now().date_naive();

        let tasks = self
            .operations
            .select(
                &Query::table("tasks")
                    .select("status")
                    .eq("location_id", &location.id)
                    .eq("date", today),
            )
            .await?;
        let logs = self
            .operations
            .select(
                &Query::table("temperature_logs")
                    .eq("location_id", &location.id)
                    .gte("logged_at", format!("{today}T00:00:00")),
            )
            .await?;
        let unread = self
            .operations
            .select(&with_audience(
                Query::table("messages").select("id, is_read").eq("is_read", false),
                &user,
                Some(&location),
            ))
            .await?;

        if logs.source == Source::Remote {
            let rows: Vec<TemperatureLog> = parse_rows(logs.rows.clone())?;
            self.operations
                .cache()
                .cache(SnapshotUpdate::default().temperature_logs(rows))
                .await?;
        }

        let stats = compute_stats(today, &tasks, &logs, &unread);
        self.state.send_modify(|state| state.stats = Some(stats));
        Ok(())
    }

    /// Flip a subtask's completion, rolling back if the write is rejected.
    ///
    /// An update queued while offline counts as accepted.
    pub async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<()> {
        let snapshot = self.snapshot();
        let Some(user) = snapshot.user else {
            return Ok(());
        };
        let previous = snapshot
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .and_then(|task| task.subtask(subtask_id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("subtask {subtask_id} of task {task_id}")))?;

        let mut toggled = previous.clone();
        toggled.toggle(&user.id, Utc::now());
        self.replace_subtask(task_id, &toggled);

        let updates = json!({
            "completed": toggled.completed,
            "completed_at": toggled.completed_at.map(iso_timestamp),
            "completed_by": toggled.completed_by,
        });
        if let Err(error) = self.operations.update("subtasks", subtask_id, updates).await {
            tracing::warn!("Rolling back subtask {} toggle: {}", subtask_id, error);
            self.replace_subtask(task_id, &previous);
            return Err(error);
        }
        self.refresh_sync_status().await
    }

    /// Mark a message read, rolling back if the write is rejected.
    pub async fn mark_message_read(&self, message_id: &str) -> Result<()> {
        let was_read = self
            .snapshot()
            .messages
            .iter()
            .find(|message| message.id == message_id)
            .map(|message| message.is_read)
            .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;

        self.set_message_read(message_id, true);
        if let Err(error) = self
            .operations
            .update("messages", message_id, json!({ "is_read": true }))
            .await
        {
            tracing::warn!("Rolling back read flag of message {}: {}", message_id, error);
            self.set_message_read(message_id, was_read);
            return Err(error);
        }
        self.refresh_sync_status().await
    }

    /// Drain queued changes, then bring the session up to date.
    ///
    /// Placeholder ids held in memory are replaced with server ids, and the
    /// collections are refetched when anything reached the server.
    pub async fn sync_offline_changes(&self) -> Result<DrainReport> {
        self.state
            .send_modify(|state| state.sync_state = SyncState::Syncing);

        let report = match self.operations.sync().await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!("Offline sync failed: {}", error);
                self.state
                    .send_modify(|state| state.sync_state = SyncState::Error);
                return Err(error);
            }
        };

        if !report.id_mappings.is_empty() {
            self.apply_id_mappings(&report.id_mappings)?;
        }
        if report.success > 0 {
            if let Err(error) = self.refresh_collections().await {
                tracing::warn!("Refetch after sync failed: {}", error);
            }
        }
        self.refresh_sync_status().await?;
        Ok(report)
    }

    /// Forget the session, including every queued change and the cache.
    pub async fn sign_out(&self) -> Result<()> {
        let queue = self.operations.queue();
        queue.clear().await?;
        queue.clear_dead_letters().await?;
        self.operations.cache().clear().await?;

        let online = self.operations.is_online().await;
        self.state.send_replace(AppState {
            is_loading: false,
            is_online: online,
            sync_state: SyncState::derive(online, 0, 0),
            ..AppState::default()
        });
        tracing::info!("Signed out and cleared offline data");
        Ok(())
    }

    /// Recount queued changes and recompute the sync indicator.
    pub async fn refresh_sync_status(&self) -> Result<()> {
        let queue = self.operations.queue();
        let pending = queue.pending_count().await?;
        let dead_lettered = queue.dead_letters().await?.len();
        let online = self.operations.is_online().await;

        self.state.send_modify(|state| {
            state.pending_changes = pending;
            state.dead_lettered = dead_lettered;
            state.is_online = online;
            state.sync_state = SyncState::derive(online, pending, dead_lettered);
        });
        Ok(())
    }

    async fn refresh_collections(&self) -> Result<()> {
        let date = self
            .snapshot()
            .selected_date
            .unwrap_or_else(|| Utc::now().date_naive());
        self.fetch_tasks(date).await?;
        self.fetch_messages().await?;
        self.fetch_shifts(date).await?;
        self.fetch_stats().await
    }

    fn apply_id_mappings(&self, mappings: &[IdMapping]) -> Result<()> {
        let snapshot = self.snapshot();
        let tasks = remap_ids(&snapshot.tasks, mappings)?;
        let messages = remap_ids(&snapshot.messages, mappings)?;
        let shifts = remap_ids(&snapshot.shifts, mappings)?;

        self.state.send_modify(|state| {
            state.tasks = tasks;
            state.messages = messages;
            state.shifts = shifts;
        });
        tracing::debug!("Applied {} id mappings to session state", mappings.len());
        Ok(())
    }

    fn session(&self) -> (Option<User>, Option<Location>) {
        let state = self.state.borrow();
        (state.user.clone(), state.current_location.clone())
    }

    fn replace_subtask(&self, task_id: &str, subtask: &Subtask) {
        self.state.send_modify(|state| {
            if let Some(current) = state
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .and_then(|task| task.subtask_mut(&subtask.id))
            {
                *current = subtask.clone();
            }
        });
    }

    fn set_message_read(&self, message_id: &str, is_read: bool) {
        self.state.send_modify(|state| {
            if let Some(message) = state
                .messages
                .iter_mut()
                .find(|message| message.id == message_id)
            {
                message.is_read = is_read;
            }
        });
    }
}

fn with_audience(query: Query, user: &User, location: Option<&Location>) -> Query {
    match location {
        Some(location) => query.or(vec![
            Filter::eq("recipient_id", &user.id),
            Filter::eq("location_id", &location.id),
        ]),
        None => query.eq("recipient_id", &user.id),
    }
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    Ok(serde_json::from_value(Value::Array(rows))?)
}

fn remap_ids<T>(items: &[T], mappings: &[IdMapping]) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let mut value = serde_json::to_value(items)?;
    let replaced = mappings
        .iter()
        .map(|mapping| {
            replace_string_values(&mut value, &mapping.placeholder, &mapping.server_id)
        })
        .sum::<usize>();
    if replaced == 0 {
        return Ok(items.to_vec());
    }
    Ok(serde_json::from_value(value)?)
}

/// Derive dashboard counters from fetched rows.
///
/// Remote rows are already filtered by the server; cached rows hold whole
/// collections, so they are narrowed to today and to unread messages here.
fn compute_stats(
    today: NaiveDate,
    tasks: &Fetched,
    logs: &Fetched,
    unread: &Fetched,
) -> DashboardStats {
    let today_text = today.to_string();
    let from_cache = |fetched: &Fetched| fetched.source == Source::Cache;

    let todays_tasks = tasks
        .rows
        .iter()
        .filter(|row| !from_cache(tasks) || row["date"].as_str() == Some(today_text.as_str()))
        .collect::<Vec<_>>();
    let completed = todays_tasks
        .iter()
        .filter(|row| row["status"] == json!(TaskStatus::Completed))
        .count();

    let todays_logs = logs
        .rows
        .iter()
        .filter(|row| {
            !from_cache(logs)
                || row["logged_at"]
                    .as_str()
                    .is_some_and(|logged_at| logged_at.starts_with(&today_text))
        })
        .collect::<Vec<_>>();
    let compliant = todays_logs
        .iter()
        .filter(|row| row["is_compliant"].as_bool() == Some(true))
        .count();

    let messages_unread = unread
        .rows
        .iter()
        .filter(|row| row["is_read"].as_bool() != Some(true))
        .count();

    DashboardStats {
        tasks_completed_today: completed,
        tasks_pending_today: todays_tasks.len() - completed,
        temp_logs_today: todays_logs.len(),
        temp_compliance_rate: DashboardStats::compliance_rate(compliant, todays_logs.len()),
        messages_unread,
        sales_today: None,
        labor_percent: None,
    }
}
