//! Configuration loading and config file resolution
//!
//! Bootstrap settings live in a small TOML file. Every field has a built-in
//! default, so a missing file is never fatal: the service starts on defaults
//! and logs where its configuration came from.

use crate::criteria::ProgramId;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ACCELERA_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database holding the local criteria cache
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between background refreshes (0 disables polling)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Programs refreshed individually by the poller, in addition to the
    /// unscoped refresh. Accepts strings or numbers.
    #[serde(default)]
    pub watched_programs: Vec<ProgramId>,

    /// JSON file of criteria loaded into the in-memory list at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Remote criteria API (optional)
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote criteria API settings
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the application backend; remote feed disabled when absent
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("accelera.db")
}

fn default_port() -> u16 {
    5731
}

fn default_refresh_interval_secs() -> u64 {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            refresh_interval_secs: default_refresh_interval_secs(),
            watched_programs: Vec::new(),
            seed_file: None,
            remote: RemoteConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    ///
    /// Fails if the file cannot be read or is not valid TOML. Missing keys
    /// fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Interval between background refreshes, `None` when polling is disabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl RemoteConfig {
    /// Request timeout for remote fetches
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Config file resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `ACCELERA_CONFIG`
/// 3. User config dir (`~/.config/accelera/config.toml` on Linux)
/// 4. `/etc/accelera/config.toml` (Linux only)
///
/// Explicit paths (1 and 2) are returned even if they do not exist, so the
/// caller reports the problem instead of silently using defaults. Returns
/// `None` when nothing is configured and no default file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3 and 4: platform locations
    default_config_locations()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Platform config file locations, most specific first
fn default_config_locations() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = dirs::config_dir()
        .map(|d| d.join("accelera").join("config.toml"))
        .into_iter()
        .collect();

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/accelera/config.toml"));
    }

    candidates
}
