//! Layered settings: built-in defaults, optional TOML file, environment
//!
//! Environment variables use the `TOKEN_ANALYZER__` prefix with `__` between
//! nested keys, e.g. `TOKEN_ANALYZER__UPSTREAM__CLIENT_CREDENTIALS`.

use crate::types::{AnalyzerError, Result};
use directories::BaseDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default KPLC self-service portal
pub const DEFAULT_BASE_URL: &str = "https://selfservice.kplc.co.ke";

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const ENV_PREFIX: &str = "TOKEN_ANALYZER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding the bill and meter stores
    pub data_dir: PathBuf,
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    /// Base64 `client_id:client_secret` for the token exchange
    #[serde(default)]
    pub client_credentials: Option<String>,
    pub timeout_secs: u64,
}

impl Settings {
    /// Load settings from `~/.token-analyzer/config.toml` (if present), or
    /// from `config_file` (which must exist), then the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let base_dir = Self::default_base_dir()?;
        match config_file {
            Some(path) => Self::build(&base_dir, path, true),
            None => Self::build(&base_dir, &base_dir.join("config.toml"), false),
        }
    }

    /// `~/.token-analyzer`
    pub fn default_base_dir() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| AnalyzerError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".token-analyzer"))
    }

    fn build(base_dir: &Path, file: &Path, file_required: bool) -> Result<Self> {
        let data_dir = base_dir.join("data");

        config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())
            .and_then(|b| b.set_default("upstream.base_url", DEFAULT_BASE_URL))
            .and_then(|b| b.set_default("upstream.timeout_secs", DEFAULT_TIMEOUT_SECS as i64))
            .map_err(|e| AnalyzerError::Config(e.to_string()))?
            .add_source(config::File::from(file.to_path_buf()).required(file_required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AnalyzerError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AnalyzerError::Config(e.to_string()))
    }
}

impl UpstreamSettings {
    pub fn credentials(&self) -> Result<&str> {
        self.client_credentials
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AnalyzerError::Config(format!(
                    "upstream.client_credentials is not set (config file or {ENV_PREFIX}__UPSTREAM__CLIENT_CREDENTIALS)"
                ))
            })
    }
}
