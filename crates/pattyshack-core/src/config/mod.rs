//! Client configuration.
//!
//! `OfflineConfig` tunes the offline layer (storage keys, retry and timeout
//! policy). `RemoteConfig` locates the Supabase project the gateway talks to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_QUEUE_KEY: &str = "@pattyshack_offline_queue";
pub const DEFAULT_CACHE_KEY: &str = "@pattyshack_offline_cache";
pub const DEFAULT_DEAD_LETTER_KEY: &str = "@pattyshack_offline_dead_letters";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 15;

/// Storage keys and replay policy for the offline layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OfflineConfig {
    pub queue_key: String,
    pub cache_key: String,
    pub dead_letter_key: String,
    /// Failed replays allowed before an action is dead-lettered
    pub max_attempts: u32,
    /// Upper bound for a single replayed gateway call
    pub action_timeout_secs: u64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            dead_letter_key: DEFAULT_DEAD_LETTER_KEY.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            action_timeout_secs: DEFAULT_ACTION_TIMEOUT_SECS,
        }
    }
}

impl OfflineConfig {
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    /// Reject settings that would break the queue's guarantees.
    pub fn validate(&self) -> Result<()> {
        let keys = [&self.queue_key, &self.cache_key, &self.dead_letter_key];
        if keys.iter().any(|key| key.trim().is_empty()) {
            return Err(Error::Config("storage keys must not be empty".to_string()));
        }
        if self.queue_key == self.cache_key
            || self.queue_key == self.dead_letter_key
            || self.cache_key == self.dead_letter_key
        {
            return Err(Error::Config("storage keys must be distinct".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.action_timeout_secs == 0 {
            return Err(Error::Config(
                "action_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Supabase project location and credentials.
///
/// These are public endpoints/keys plus an optional user access token;
/// service-role secrets must never be stored here.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("supabase_url", &self.supabase_url)
            .field(
                "supabase_anon_key",
                &self.supabase_anon_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RemoteConfig {
    /// Trim values, drop empties, and strip trailing slashes from the URL.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url)
                .map(|url| url.trim_end_matches('/').to_string()),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            access_token: normalize_text_option(self.access_token),
        }
    }

    /// Fill unset fields from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            supabase_url: self.supabase_url.or(other.supabase_url),
            supabase_anon_key: self.supabase_anon_key.or(other.supabase_anon_key),
            access_token: self.access_token.or(other.access_token),
        }
    }

    /// Returns `(url, anon_key)` when both are configured.
    ///
    /// Configuring only one of the two is an error.
    pub fn resolve(&self) -> Result<Option<(String, String)>> {
        let normalized = self.clone().normalized();
        match (normalized.supabase_url, normalized.supabase_anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if is_http_url(&url) {
                    Ok(Some((url, anon_key)))
                } else {
                    Err(Error::Config(
                        "supabase_url must include http:// or https://".to_string(),
                    ))
                }
            }
            (Some(_), None) => Err(Error::Config(
                "supabase_anon_key is required when supabase_url is set".to_string(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "supabase_url is required when supabase_anon_key is set".to_string(),
            )),
        }
    }
}
