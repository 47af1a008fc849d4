//! Client configuration management.
//!
//! This module handles loading and saving the configuration, which holds
//! the last used user id, service roots and login retry settings.
//!
//! Configuration is stored at `~/.config/kiteclient/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_API_ROOT;
use crate::auth::authenticator::{
    DEFAULT_LOGIN_ROOT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL_SECS,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "kiteclient";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds, shared by login and API calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_id: Option<String>,
    pub login_root: String,
    pub api_root: String,
    pub login_max_attempts: u32,
    pub login_retry_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            login_root: DEFAULT_LOGIN_ROOT.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            login_max_attempts: DEFAULT_MAX_ATTEMPTS,
            login_retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-user cache directory holding the session file and logs.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref user_id) = self.user_id {
            path = path.join(user_id);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"user_id":"AB1234","login_max_attempts":3}"#).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("AB1234"));
        assert_eq!(config.login_max_attempts, 3);
        assert_eq!(config.login_retry_interval_secs, 1);
        assert_eq!(config.api_root, "https://kite.zerodha.com/oms");
        assert_eq!(config.login_root, "https://kite.zerodha.com");
    }

    #[test]
    fn test_defaults_match_authenticator() {
        let config = Config::default();
        let retry = crate::auth::RetryPolicy::default();
        assert_eq!(config.login_max_attempts, retry.max_attempts);
        assert_eq!(config.login_retry_interval_secs, retry.interval.as_secs());
        assert_eq!(config.request_timeout_secs, 30);
    }
}
