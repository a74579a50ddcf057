//! Durable key-value storage used by the offline queue and cache.
//!
//! Each component owns its own keys; nothing outside the owning component
//! reads or writes them.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;

/// Asynchronous string key-value store.
///
/// Provides no read-modify-write atomicity; callers serialize their own
/// updates.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Read a value, `None` when the key is absent
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Move an unreadable blob aside so the owner can start fresh.
///
/// The raw value is kept under `<key>.corrupt-<unix_ms>` for inspection.
pub(crate) async fn quarantine_blob<S: KeyValueStore>(
    store: &S,
    key: &str,
    raw: &str,
) -> Result<String> {
    let backup_key = format!("{key}.corrupt-{}", crate::util::unix_millis_now());
    store.set_item(&backup_key, raw).await?;
    store.remove_item(key).await?;
    tracing::warn!("Moved unreadable value from {} to {}", key, backup_key);
    Ok(backup_key)
}
