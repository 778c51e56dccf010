//! Core configuration
//!
//! Read from `<data_dir>/config.yaml`. Every field has a default, so a missing
//! file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    default_user_agent, CONFIG_FILE, DATA_DIR_ENV, DATA_DIR_NAME, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS,
};

/// Settings for the shared HTTP client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// When true, ignores SSL certificate errors (useful for testing environments)
    pub accept_invalid_certs: bool,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Ignore system proxy settings
    pub no_proxy: bool,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
            no_proxy: false,
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Where collections, environments and logs live
    pub data_dir: PathBuf,
    pub http: EngineConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            data_dir: default_data_dir(),
            http: EngineConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load `config.yaml` from the default data directory
    pub fn load() -> Result<Self> {
        let data_dir = default_data_dir();
        let mut config = Self::load_from(&data_dir.join(CONFIG_FILE))?;
        if config.data_dir.as_os_str().is_empty() {
            config.data_dir = data_dir;
        }
        Ok(config)
    }

    /// Load from an explicit file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(CoreConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(CoreConfig::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// `$FREEMAN_HOME`, else `~/.freeman`, else `./.freeman`
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.http, EngineConfig::default());
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "data_dir: /tmp/freeman\nhttp:\n  timeout_secs: 5\n  no_proxy: true\n",
        )
        .unwrap();

        let config = CoreConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/freeman"));
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.http.no_proxy);
        assert!(config.http.follow_redirects);
        assert_eq!(config.http.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "http: [not, a, map]\n").unwrap();
        let err = CoreConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }
}
