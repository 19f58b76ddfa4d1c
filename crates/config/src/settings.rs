// Application settings
// Loaded from ~/.config/ledgercheck/settings.toml

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ledgercheck_report::{RowFilter, Variant};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Environment variables consulted after the settings file.
pub const ENV_SERVER: &str = "LEDGERCHECK_SERVER";
pub const ENV_VARIANT: &str = "LEDGERCHECK_VARIANT";
pub const ENV_TIMEOUT: &str = "LEDGERCHECK_TIMEOUT";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "cannot access {}: {}", path.display(), message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid settings in {}: {}", path.display(), message)
            }
            ConfigError::Invalid(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the reconciliation backend
    pub server_url: String,

    /// Which backend contract to speak
    pub variant: Variant,

    /// Request timeout. None waits as long as the backend takes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Initial ledger table filter ("all", "e110", "e111", "e116", "e001")
    pub default_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            variant: Variant::Legacy,
            timeout_secs: None,
            default_filter: "all".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ledgercheck")
            .join("settings.toml")
    }

    /// Load from `path` (defaults if it does not exist) and apply overrides
    /// looked up through `env`.
    pub fn load_with_env<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::load_file(path)?;
        settings.apply_env(env)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read a settings file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_SERVER) {
            self.server_url = url.trim().to_string();
        }
        if let Some(name) = non_empty(ENV_VARIANT) {
            self.variant = name
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", ENV_VARIANT, e)))?;
        }
        if let Some(secs) = non_empty(ENV_TIMEOUT) {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a whole number of seconds", ENV_TIMEOUT))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "server_url must start with http:// or https:// (got \"{}\")",
                self.server_url
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        self.filter()?;
        Ok(())
    }

    pub fn filter(&self) -> Result<RowFilter, ConfigError> {
        self.default_filter
            .parse()
            .map_err(|e: String| ConfigError::Invalid(format!("default_filter: {}", e)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Write these settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(path, text).map_err(io_err)
    }
}
