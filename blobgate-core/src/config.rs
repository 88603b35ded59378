//! Configuration for the pre-push gate.
//!
//! Two settings are required before any object processing can begin: the
//! local cache directory and the remote bucket/prefix. They live in a JSON
//! file `blobgate.json` at the repository root (overridable via the
//! `BLOBGATE_CONFIG` environment variable). Their absence is a fatal
//! precondition failure, not a per-file outcome.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default attribute filter name marking a path as large-object-managed.
pub const DEFAULT_FILTER: &str = "blobgate";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BLOBGATE_CONFIG";

/// Name of the config file looked up at the repository root.
pub const CONFIG_FILE: &str = "blobgate.json";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Config field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("Failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Gate configuration stored at `<repo>/blobgate.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding locally cached blobs, named by content identity.
    pub cache_dir: PathBuf,
    /// Remote bucket/prefix objects are copied under (e.g. `gs://bucket/blobs`).
    pub remote: String,
    /// Attribute filter value marking a path as managed.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Config {
    /// Load config from an explicit file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config for a repository rooted at `repo_root`, honoring the
    /// `BLOBGATE_CONFIG` override.
    pub fn discover(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => PathBuf::from(p),
            None => repo_root.join(CONFIG_FILE),
        };
        Self::load(&path)
    }

    /// Save config to `<repo_root>/blobgate.json` (atomic via tmp + rename).
    pub fn save(&self, repo_root: &Path) -> Result<(), std::io::Error> {
        let config_path = repo_root.join(CONFIG_FILE);
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &config_path)?;
        Ok(())
    }

    /// Ensure the cache directory exists, creating it if missing.
    pub fn ensure_cache_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| ConfigError::CacheDir {
            path: self.cache_dir.clone(),
            source: e,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField("cache_dir"));
        }
        if self.remote.trim().is_empty() {
            return Err(ConfigError::EmptyField("remote"));
        }
        if self.filter.trim().is_empty() {
            return Err(ConfigError::EmptyField("filter"));
        }
        Ok(())
    }
}
