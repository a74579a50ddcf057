//! Offline-aware data operations.
//!
//! Online calls go straight to the gateway. Offline mutations are queued and
//! answered optimistically so callers never wait for connectivity.

use serde_json::{Map, Value};

use crate::config::OfflineConfig;
use crate::connectivity::{ConnectivityMonitor, NetworkProbe};
use crate::error::{Error, Result};
use crate::gateway::{Query, RemoteGateway};
use crate::storage::KeyValueStore;

use super::action::{placeholder_id, NewAction};
use super::cache::{OfflineCache, CACHED_TABLES};
use super::queue::{DrainReport, OfflineQueue};

/// Where a set of rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub rows: Vec<Value>,
    pub source: Source,
}

/// Facade over the gateway, the mutation queue and the snapshot cache.
#[derive(Clone)]
pub struct OfflineOperations<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    gateway: G,
    monitor: ConnectivityMonitor<P>,
    queue: OfflineQueue<S>,
    cache: OfflineCache<S>,
}

impl<G, S, P> OfflineOperations<G, S, P>
where
    G: RemoteGateway,
    S: KeyValueStore,
    P: NetworkProbe,
{
    pub fn new(
        gateway: G,
        monitor: ConnectivityMonitor<P>,
        store: S,
        config: OfflineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let cache = OfflineCache::new(store.clone(), config.cache_key.clone());
        Ok(Self {
            gateway,
            monitor,
            queue: OfflineQueue::new(store, config),
            cache,
        })
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn monitor(&self) -> &ConnectivityMonitor<P> {
        &self.monitor
    }

    pub const fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    pub const fn cache(&self) -> &OfflineCache<S> {
        &self.cache
    }

    pub async fn is_online(&self) -> bool {
        self.monitor.is_online().await
    }

    /// Insert a record.
    ///
    /// Offline, the returned record carries a placeholder `id` that later
    /// updates and deletes may target; it is resolved when the queue drains.
    pub async fn insert(&self, table: &str, data: Value) -> Result<Value> {
        let Value::Object(fields) = data else {
            return Err(Error::InvalidInput(format!(
                "insert into {table} expects a JSON object"
            )));
        };

        if self.is_online().await {
            return Ok(self.gateway.insert(table, &Value::Object(fields)).await?);
        }

        let placeholder = placeholder_id();
        let mut optimistic = fields.clone();
        optimistic.insert("id".to_string(), Value::String(placeholder.clone()));
        self.queue
            .enqueue(NewAction::insert(table, Value::Object(fields)).with_placeholder(&placeholder))
            .await?;
        tracing::info!("Offline: queued insert into {} as {}", table, placeholder);
        Ok(Value::Object(optimistic))
    }

    /// Apply a partial update.
    pub async fn update(&self, table: &str, id: &str, updates: Value) -> Result<Value> {
        let Value::Object(fields) = updates else {
            return Err(Error::InvalidInput(format!(
                "update of {table} expects a JSON object"
            )));
        };

        if self.is_online().await {
            return Ok(self
                .gateway
                .update(table, id, &Value::Object(fields))
                .await?);
        }

        let mut optimistic = Map::new();
        optimistic.insert("id".to_string(), Value::String(id.to_string()));
        optimistic.extend(fields.clone());
        self.queue
            .enqueue(NewAction::update(table, id, Value::Object(fields)))
            .await?;
        tracing::info!("Offline: queued update of {} {}", table, id);
        Ok(Value::Object(optimistic))
    }

    pub async fn delete(&self, table: &str, id: &str) -> Result<Value> {
        if self.is_online().await {
            return Ok(self.gateway.delete(table, id).await?);
        }

        self.queue.enqueue(NewAction::delete(table, id)).await?;
        tracing::info!("Offline: queued delete of {} {}", table, id);
        Ok(Value::Null)
    }

    /// Run a query, falling back to cached rows while offline.
    ///
    /// Cached rows are returned as stored; the query's filters are not
    /// re-applied to them.
    pub async fn select(&self, query: &Query) -> Result<Fetched> {
        if self.is_online().await {
            let rows = self.gateway.select(query).await?;
            return Ok(Fetched {
                rows,
                source: Source::Remote,
            });
        }

        let snapshot = self.cache.read().await?;
        match snapshot.rows_for(&query.table)? {
            Some(rows) => {
                tracing::debug!(
                    table = query.table.as_str(),
                    rows = rows.len(),
                    "Offline: serving cached rows"
                );
                Ok(Fetched {
                    rows,
                    source: Source::Cache,
                })
            }
            None => Err(Error::Offline(format!(
                "{} is not available offline (cached tables: {})",
                query.table.as_str(),
                CACHED_TABLES.join(", ")
            ))),
        }
    }

    /// Drain the mutation queue now.
    pub async fn sync(&self) -> Result<DrainReport> {
        self.queue.drain(&self.gateway, &self.monitor).await
    }
}
