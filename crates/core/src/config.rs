use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::params::DEFAULT_MYSQL_PORT;

pub const CONFIG_DIR_ENV: &str = "ULTI_CONFIG_DIR";
pub const DEFAULT_PREVIEW_ROW_LIMIT: usize = 100;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionDefaults {
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            engine: "MySQL".to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: "root".to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl ConnectionDefaults {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserSettings {
    pub preview_row_limit: usize,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            preview_row_limit: DEFAULT_PREVIEW_ROW_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Settings read from `config.toml`. Passwords are never part of it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionDefaults,
    pub browser: BrowserSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_path(default_config_path()?)
    }

    /// A missing or blank file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.port == 0 {
            return Err(ConfigError::Invalid {
                field: "connection.port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        if self.connection.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "connection.connect_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.browser.preview_row_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "browser.preview_row_limit",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(custom) = env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(custom).join("config.toml"));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("ulti").join("config.toml"))
}
