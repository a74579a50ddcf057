//! pattyshack-core - Core library for Pattyshack Ops
//!
//! This crate contains the shared models and the offline layer used by every
//! Pattyshack client: connectivity monitoring, the durable mutation queue,
//! the local snapshot cache, the offline-aware operation facade, and the
//! application state store.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod gateway;
pub mod models;
pub mod offline;
pub mod state;
pub mod storage;
pub mod store;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use offline::{OfflineCache, OfflineOperations, OfflineQueue, QueuedAction};
pub use store::AppStore;
