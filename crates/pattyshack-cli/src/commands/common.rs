use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pattyshack_core::connectivity::{ConnectivityMonitor, HttpProbe};
use pattyshack_core::gateway::SupabaseGateway;
use pattyshack_core::offline::{OfflineCache, OfflineOperations, OfflineQueue, QueuedAction};
use pattyshack_core::storage::SqliteStore;
use pattyshack_core::util::compact_text;
use serde_json::Value;

use crate::config_file::{default_config_path, default_db_path, remote_from_vars, CliConfig};
use crate::error::CliError;

pub type CliOperations = OfflineOperations<SupabaseGateway, SqliteStore, HttpProbe>;

/// Resolved paths and configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub config: CliConfig,
}

impl Context {
    pub fn load(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path().map_err(CliError::Config)?,
        };
        let db_path = match db_path {
            Some(path) => path,
            None => default_db_path().map_err(CliError::Config)?,
        };
        let config = CliConfig::load_from_path(&config_path).map_err(CliError::Config)?;
        config.offline.validate()?;

        Ok(Self {
            db_path,
            config_path,
            config,
        })
    }

    pub fn open_store(&self) -> Result<SqliteStore, CliError> {
        Ok(SqliteStore::open(self.db_path.clone())?)
    }

    pub fn queue(&self, store: SqliteStore) -> OfflineQueue<SqliteStore> {
        OfflineQueue::new(store, self.config.offline.clone())
    }

    pub fn cache(&self, store: SqliteStore) -> OfflineCache<SqliteStore> {
        OfflineCache::new(store, self.config.offline.cache_key.clone())
    }

    /// Wire the facade against the configured Supabase project.
    pub fn operations(&self, store: SqliteStore) -> Result<CliOperations, CliError> {
        let remote = self
            .config
            .effective_remote(remote_from_vars(|name| std::env::var(name).ok()));
        let (url, anon_key) = remote.resolve()?.ok_or(CliError::NotConfigured)?;

        let gateway = SupabaseGateway::new(&url, anon_key)?.with_access_token(remote.access_token);
        let probe = HttpProbe::new(gateway.rest_url())?;
        let monitor = ConnectivityMonitor::new(probe);
        Ok(OfflineOperations::new(
            gateway,
            monitor,
            store,
            self.config.offline.clone(),
        )?)
    }
}

/// Parse a command-line JSON argument that must be an object.
pub fn parse_object(raw: &str) -> Result<Value, CliError> {
    let value = serde_json::from_str::<Value>(raw)
        .map_err(|error| CliError::InvalidPayload(error.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CliError::InvalidPayload("expected a JSON object".to_string()))
    }
}

pub fn format_action_lines(actions: &[QueuedAction]) -> Vec<String> {
    actions
        .iter()
        .map(|action| {
            let target = action
                .target_id()
                .or(action.placeholder_id.as_deref())
                .unwrap_or("-");
            let mut line = format!(
                "{}  {:<6} {:<18} {:<24} {}",
                short_id(&action.id),
                action.kind.as_str(),
                action.table,
                target,
                format_timestamp(action.timestamp),
            );
            if action.attempts > 0 {
                line.push_str(&format!("  attempts={}", action.attempts));
            }
            if let Some(error) = &action.last_error {
                line.push_str(&format!("  last_error={}", compact_text(error)));
            }
            line
        })
        .collect()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Human-readable age like `3m ago`.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds().max(0);
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

/// Last eight characters; the leading part of a v7 id is the timestamp.
fn short_id(id: &str) -> &str {
    id.get(id.len().saturating_sub(8)..).unwrap_or(id)
}
