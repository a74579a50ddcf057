//! Durable FIFO queue of mutations made while offline.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::OfflineConfig;
use crate::connectivity::{ConnectivityMonitor, NetworkProbe};
use crate::error::{Error, Result};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::state::ActionState;
use crate::storage::{quarantine_blob, KeyValueStore};

use super::action::{ActionKind, IdMapping, NewAction, QueuedAction};

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub success: usize,
    /// Replays that failed or timed out, plus actions held back behind a
    /// failed insert or orphaned by a dead-lettered one
    pub failed: usize,
    /// Subset of `failed` moved to the dead-letter list in this pass
    pub dead_lettered: usize,
    pub id_mappings: Vec<IdMapping>,
}

impl DrainReport {
    pub const fn attempted(&self) -> usize {
        self.success + self.failed
    }
}

/// Persisted, ordered list of pending mutations.
///
/// Every read-modify-write of the persisted list runs under one async mutex,
/// so concurrent `enqueue` calls never lose entries. Drains are single-flight.
#[derive(Clone)]
pub struct OfflineQueue<S: KeyValueStore> {
    store: S,
    config: OfflineConfig,
    /// Guards the persisted lists; the value counts `clear` calls.
    write_lock: Arc<Mutex<u64>>,
    drain_lock: Arc<Mutex<()>>,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    pub fn new(store: S, config: OfflineConfig) -> Self {
        Self {
            store,
            config,
            write_lock: Arc::new(Mutex::new(0)),
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub const fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Append an action and persist the list before returning it.
    pub async fn enqueue(&self, action: NewAction) -> Result<QueuedAction> {
        if action.table.trim().is_empty() {
            return Err(Error::InvalidInput("table must not be empty".to_string()));
        }

        let queued = QueuedAction::from_new(action);
        let _guard = self.write_lock.lock().await;
        let mut actions = self.load(&self.config.queue_key).await?;
        actions.push(queued.clone());
        self.persist(&self.config.queue_key, &actions).await?;

        tracing::debug!(
            action_id = %queued.id,
            kind = queued.kind.as_str(),
            table = %queued.table,
            pending = actions.len(),
            "Queued offline action"
        );
        Ok(queued)
    }

    /// Pending actions in enqueue order.
    pub async fn list(&self) -> Result<Vec<QueuedAction>> {
        let _guard = self.write_lock.lock().await;
        self.load(&self.config.queue_key).await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// Drop every pending action. Used on sign-out, never by a drain.
    ///
    /// A drain already in flight discards its leftovers instead of writing
    /// them back.
    pub async fn clear(&self) -> Result<()> {
        let mut generation = self.write_lock.lock().await;
        self.store.remove_item(&self.config.queue_key).await?;
        *generation = generation.wrapping_add(1);
        tracing::info!("Cleared offline queue");
        Ok(())
    }

    /// Actions that exhausted their attempts, oldest first.
    pub async fn dead_letters(&self) -> Result<Vec<QueuedAction>> {
        let _guard = self.write_lock.lock().await;
        self.load(&self.config.dead_letter_key).await
    }

    /// Move dead letters back to the end of the queue with fresh attempts.
    pub async fn retry_dead_letters(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let letters = self.load(&self.config.dead_letter_key).await?;
        if letters.is_empty() {
            return Ok(0);
        }

        let count = letters.len();
        let mut actions = self.load(&self.config.queue_key).await?;
        actions.extend(letters.into_iter().map(|mut action| {
            action.attempts = 0;
            action
        }));
        self.persist(&self.config.queue_key, &actions).await?;
        self.store.remove_item(&self.config.dead_letter_key).await?;
        tracing::info!("Requeued {} dead-lettered actions", count);
        Ok(count)
    }

    pub async fn clear_dead_letters(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove_item(&self.config.dead_letter_key).await
    }

    /// Replay pending actions against the gateway, in enqueue order.
    ///
    /// Does nothing while offline. Each action is independent: a failure is
    /// recorded and the pass continues. Afterwards the persisted queue holds
    /// exactly the failed actions followed by anything enqueued meanwhile.
    pub async fn drain<G, P>(
        &self,
        gateway: &G,
        monitor: &ConnectivityMonitor<P>,
    ) -> Result<DrainReport>
    where
        G: RemoteGateway,
        P: NetworkProbe,
    {
        let _flight = self.drain_lock.lock().await;

        if !monitor.is_online().await {
            tracing::debug!("Skipping offline queue drain while offline");
            return Ok(DrainReport::default());
        }

        let (generation, snapshot) = {
            let guard = self.write_lock.lock().await;
            (*guard, self.load(&self.config.queue_key).await?)
        };
        if snapshot.is_empty() {
            return Ok(DrainReport::default());
        }
        tracing::info!("Draining {} offline actions", snapshot.len());

        let taken = snapshot
            .iter()
            .map(|action| action.id.clone())
            .collect::<HashSet<_>>();
        let mut pending = VecDeque::from(snapshot);
        let mut remaining = Vec::new();
        let mut dead = Vec::new();
        // Placeholders minted by inserts still queued in this pass
        let mut known = HashSet::new();
        // Placeholders whose insert failed or was held back in this pass
        let mut unresolved = HashSet::new();
        let mut report = DrainReport::default();

        while let Some(mut action) = pending.pop_front() {
            let orphan = action
                .placeholder_refs()
                .into_iter()
                .find(|placeholder| !known.contains(*placeholder))
                .map(str::to_string);
            if let Some(placeholder) = orphan {
                tracing::warn!(
                    action_id = %action.id,
                    placeholder = %placeholder,
                    "Dead-lettering action whose offline record is no longer queued"
                );
                action.record_failure(format!(
                    "depends on offline record {placeholder} that is no longer queued"
                ));
                report.failed += 1;
                report.dead_lettered += 1;
                dead.push(action);
                continue;
            }
            if let Some(placeholder) = &action.placeholder_id {
                known.insert(placeholder.clone());
            }

            let blocked_by = unresolved
                .iter()
                .find(|placeholder: &&String| action.references(placeholder))
                .cloned();
            if let Some(placeholder) = blocked_by {
                tracing::debug!(
                    action_id = %action.id,
                    placeholder = %placeholder,
                    "Holding back action behind an unsynced insert"
                );
                if let Some(own) = &action.placeholder_id {
                    unresolved.insert(own.clone());
                }
                report.failed += 1;
                remaining.push(action);
                continue;
            }

            let state = ActionState::Syncing;
            match self.replay(gateway, &action).await {
                Ok(row) => {
                    report.success += 1;
                    tracing::debug!(
                        action_id = %action.id,
                        state = ?state.after_replay(true, false),
                        "Replayed offline action"
                    );

                    if let Some(mapping) = resolve_placeholder(&action, &row) {
                        for later in pending.iter_mut().chain(remaining.iter_mut()) {
                            later.replace_id(&mapping.placeholder, &mapping.server_id);
                        }
                        report.id_mappings.push(mapping);
                    }
                }
                Err(error) => {
                    action.record_failure(error.to_string());
                    let exhausted = action.attempts >= self.config.max_attempts;
                    let next = state.after_replay(false, exhausted);
                    tracing::warn!(
                        action_id = %action.id,
                        kind = action.kind.as_str(),
                        table = %action.table,
                        attempts = action.attempts,
                        transient = error.as_gateway().map(GatewayError::is_transient),
                        state = ?next,
                        "Failed to sync offline action: {}",
                        error
                    );

                    if let Some(placeholder) = &action.placeholder_id {
                        unresolved.insert(placeholder.clone());
                    }
                    report.failed += 1;
                    if next == ActionState::DeadLettered {
                        report.dead_lettered += 1;
                        dead.push(action);
                    } else {
                        remaining.push(action);
                    }
                }
            }
        }

        let current = self.write_lock.lock().await;
        if *current != generation {
            tracing::info!(
                discarded = remaining.len() + dead.len(),
                "Offline queue was cleared during the drain; dropping unsynced actions"
            );
            return Ok(report);
        }
        let mut appended = self
            .load(&self.config.queue_key)
            .await?
            .into_iter()
            .filter(|action| !taken.contains(&action.id))
            .collect::<Vec<_>>();
        for mapping in &report.id_mappings {
            for action in &mut appended {
                action.replace_id(&mapping.placeholder, &mapping.server_id);
            }
        }
        remaining.extend(appended);
        self.persist(&self.config.queue_key, &remaining).await?;

        if !dead.is_empty() {
            let mut letters = self.load(&self.config.dead_letter_key).await?;
            letters.extend(dead);
            self.persist(&self.config.dead_letter_key, &letters).await?;
        }

        tracing::info!(
            success = report.success,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            "Offline queue drain finished"
        );
        Ok(report)
    }

    async fn replay<G: RemoteGateway>(&self, gateway: &G, action: &QueuedAction) -> Result<Value> {
        let timeout = self.config.action_timeout();
        let call = async {
            match action.kind {
                ActionKind::Insert => gateway.insert(&action.table, &action.data).await,
                ActionKind::Update => {
                    let id = required_target(action)?;
                    let updates = action.updates().cloned().unwrap_or(Value::Null);
                    gateway.update(&action.table, id, &updates).await
                }
                ActionKind::Delete => {
                    let id = required_target(action)?;
                    gateway.delete(&action.table, id).await
                }
            }
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GatewayError::Timeout(timeout).into()),
        }
    }

    async fn load(&self, key: &str) -> Result<Vec<QueuedAction>> {
        let Some(raw) = self.store.get_item(key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(actions) => Ok(actions),
            Err(error) => {
                tracing::warn!("Offline queue at {} is unreadable: {}", key, error);
                quarantine_blob(&self.store, key, &raw).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn persist(&self, key: &str, actions: &[QueuedAction]) -> Result<()> {
        let raw = serde_json::to_string(actions)?;
        self.store.set_item(key, &raw).await
    }
}

fn required_target(action: &QueuedAction) -> std::result::Result<&str, GatewayError> {
    action.target_id().ok_or_else(|| {
        GatewayError::InvalidResponse(format!(
            "queued {} on {} has no target id",
            action.kind.as_str(),
            action.table
        ))
    })
}

fn resolve_placeholder(action: &QueuedAction, row: &Value) -> Option<IdMapping> {
    let placeholder = action.placeholder_id.as_ref()?;
    let server_id = match row.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    Some(IdMapping {
        placeholder: placeholder.clone(),
        server_id,
    })
}
