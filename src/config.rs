//! Client configuration - `~/.plugdeck/config.yaml` plus env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_FILE, DATA_DIR_NAME, DEFAULT_ALERT_SECS, DEFAULT_BASE_URL,
    DEFAULT_POLL_INTERVAL_SECS, ENV_BASE_URL, ENV_USER,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend root, e.g. `http://192.168.0.10:5005`
    pub base_url: String,
    /// Identity used for "is this plug mine" checks. When unset the
    /// token's `sub` claim is used instead.
    pub username: Option<String>,
    pub poll_interval_secs: u64,
    pub alert_secs: u64,
    /// No timeout is applied unless set
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: String::from(DEFAULT_BASE_URL),
            username: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            alert_secs: DEFAULT_ALERT_SECS,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load from the default data directory, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = data_dir().join(CONFIG_FILE);
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        // An empty file parses as null
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(user) = lookup(ENV_USER).filter(|v| !v.trim().is_empty()) {
            self.username = Some(user);
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn alert_duration(&self) -> Duration {
        Duration::from_secs(self.alert_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// `~/.plugdeck`, falling back to `./.plugdeck` without a home directory
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "base_url: http://10.0.0.2:5005\nusername: alice\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:5005");
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.alert_secs, 4);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "poll_interval_secs: [not, a, number]\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "https://plugs.example.com"),
            (ENV_USER, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            username: Some("bob".into()),
            ..Config::default()
        };
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "https://plugs.example.com");
        // Blank override is ignored
        assert_eq!(config.username.as_deref(), Some("bob"));
    }
}
