//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use pattyshack_core::config::{OfflineConfig, RemoteConfig};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const DATABASE_FILE_NAME: &str = "offline.db";
const APP_DIR: &str = "pattyshack";

pub const ENV_SUPABASE_URL: &str = "PATTYSHACK_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "PATTYSHACK_SUPABASE_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "PATTYSHACK_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            remote: RemoteConfig::default(),
            offline: OfflineConfig::default(),
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_db_path() -> Result<PathBuf, String> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE_NAME))
        .ok_or_else(|| "Failed to resolve local data directory".to_string())
}

/// Remote settings from `PATTYSHACK_*` variables, looked up through `lookup`.
pub fn remote_from_vars(lookup: impl Fn(&str) -> Option<String>) -> RemoteConfig {
    RemoteConfig {
        supabase_url: lookup(ENV_SUPABASE_URL),
        supabase_anon_key: lookup(ENV_SUPABASE_ANON_KEY),
        access_token: lookup(ENV_ACCESS_TOKEN),
    }
    .normalized()
}

impl CliConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Environment values win over the file.
    pub fn effective_remote(&self, env: RemoteConfig) -> RemoteConfig {
        env.normalized().or(self.remote.clone().normalized())
    }

    fn normalize(&mut self) {
        self.remote = self.remote.clone().normalized();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn config_roundtrip_normalizes_remote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = CliConfig {
            remote: RemoteConfig {
                supabase_url: Some(" https://project.supabase.co/ ".to_string()),
                supabase_anon_key: Some(" anon-key ".to_string()),
                access_token: Some(" ".to_string()),
            },
            ..CliConfig::default()
        };

        config.save_to_path(&path).unwrap();
        let loaded = CliConfig::load_from_path(&path).unwrap();

        assert_eq!(
            loaded.remote.supabase_url.as_deref(),
            Some("https://project.supabase.co")
        );
        assert_eq!(loaded.remote.supabase_anon_key.as_deref(), Some("anon-key"));
        assert!(loaded.remote.access_token.is_none());
        assert_eq!(loaded.offline, OfflineConfig::default());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliConfig::default());
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = CliConfig {
            remote: RemoteConfig {
                supabase_url: Some("https://file.supabase.co".to_string()),
                supabase_anon_key: Some("file-key".to_string()),
                access_token: None,
            },
            ..CliConfig::default()
        };
        let env = remote_from_vars(|name| match name {
            ENV_SUPABASE_URL => Some("https://env.supabase.co".to_string()),
            ENV_ACCESS_TOKEN => Some("user-token".to_string()),
            _ => None,
        });

        let remote = config.effective_remote(env);

        assert_eq!(remote.supabase_url.as_deref(), Some("https://env.supabase.co"));
        assert_eq!(remote.supabase_anon_key.as_deref(), Some("file-key"));
        assert_eq!(remote.access_token.as_deref(), Some("user-token"));
    }
}
