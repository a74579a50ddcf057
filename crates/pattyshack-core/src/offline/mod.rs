//! Offline layer: durable mutation queue, snapshot cache, the offline-aware
//! operation facade, and the reconnect-driven auto-sync loop.

mod action;
mod auto_sync;
mod cache;
mod operations;
mod queue;

pub use action::{
    is_placeholder_id, placeholder_id, ActionKind, IdMapping, NewAction, QueuedAction,
    PLACEHOLDER_PREFIX,
};
pub use auto_sync::{AutoSync, AutoSyncEvent};
pub use cache::{CachedSnapshot, OfflineCache, SnapshotUpdate, CACHED_TABLES};
pub use operations::{Fetched, OfflineOperations, Source};
pub use queue::{DrainReport, OfflineQueue};
