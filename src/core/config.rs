//! Configuration management for safeupdate.
//!
//! Handles loading configuration from TOML files. Command-line flags are
//! applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default location of published plugin archives.
pub const DEFAULT_REGISTRY_URL: &str = "https://downloads.wordpress.org/plugin";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-run behaviour
    pub run: RunConfig,

    /// Upstream artifact source settings
    pub upstream: UpstreamConfig,

    /// WordPress installation settings
    pub wordpress: WordPressConfig,
}

/// Options that shape a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Report what would be updated without touching the installation
    pub dry_run: bool,

    /// Do not persist the run log
    pub no_log: bool,

    /// Where the run log is written (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Invalidate the upstream cache before fetching
    pub flush_cache: bool,

    /// Persist only the reports of plugins that differ from upstream
    pub save_diffs_only: bool,

    /// Keep the previous log under a timestamped name instead of truncating it
    pub save_old_logs: bool,

    /// Scratch directory for unpacked upstream archives (a temp dir if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Extra fetch attempts after a network failure
    pub fetch_retries: u32,
}

/// Upstream artifact source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL serving `{slug}.{version}.zip`
    pub registry_url: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

/// WordPress installation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    /// Installation root
    pub path: PathBuf,

    /// wp-cli executable
    pub wp_binary: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.safeupdate.toml` in current directory
    /// 2. `~/.config/safeupdate/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".safeupdate.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("safeupdate"))
    }

    /// Get the data directory path (for the run log).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("safeupdate"))
    }
}

impl RunConfig {
    /// Resolve the log file path, falling back to the data directory.
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            Config::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("safeupdate.log")
        })
    }
}

impl UpstreamConfig {
    /// HTTP timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            no_log: false,
            log_file: None,
            flush_cache: false,
            save_diffs_only: false,
            save_old_logs: false,
            scratch_dir: None,
            fetch_retries: 0,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { registry_url: DEFAULT_REGISTRY_URL.to_string(), timeout_secs: 60 }
    }
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("."), wp_binary: "wp".to_string() }
    }
}
