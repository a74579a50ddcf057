//! Shared cross-platform state types.

use serde::{Deserialize, Serialize};

/// Unified sync state used by every client's pending-changes indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Pending,
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    /// Derive the indicator state from connectivity and queue counters.
    pub const fn derive(online: bool, pending: usize, dead_lettered: usize) -> Self {
        if dead_lettered > 0 {
            Self::Error
        } else if !online {
            Self::Offline
        } else if pending > 0 {
            Self::Pending
        } else {
            Self::Synced
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

/// Lifecycle of a single queued mutation.
///
/// `Unsynced -> Syncing -> Synced`, with `Syncing -> Unsynced` on a failed
/// replay and `Unsynced -> DeadLettered` once retries are exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Unsynced,
    Syncing,
    Synced,
    DeadLettered,
}

impl ActionState {
    /// Apply the outcome of one replay attempt.
    pub const fn after_replay(self, succeeded: bool, exhausted: bool) -> Self {
        match (self, succeeded) {
            (Self::Syncing, true) => Self::Synced,
            (Self::Syncing, false) if exhausted => Self::DeadLettered,
            (Self::Syncing, false) => Self::Unsynced,
            (state, _) => state,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Synced | Self::DeadLettered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_prefers_error_then_offline() {
        assert_eq!(SyncState::derive(true, 3, 1), SyncState::Error);
        assert_eq!(SyncState::derive(false, 3, 0), SyncState::Offline);
        assert_eq!(SyncState::derive(true, 3, 0), SyncState::Pending);
        assert_eq!(SyncState::derive(true, 0, 0), SyncState::Synced);
    }

    #[test]
    fn failed_replay_returns_to_unsynced_until_exhausted() {
        let state = ActionState::Syncing;
        assert_eq!(state.after_replay(true, false), ActionState::Synced);
        assert_eq!(state.after_replay(false, false), ActionState::Unsynced);
        assert_eq!(state.after_replay(false, true), ActionState::DeadLettered);
        assert!(!ActionState::Unsynced.is_terminal());
        assert!(ActionState::DeadLettered.is_terminal());
    }
}
