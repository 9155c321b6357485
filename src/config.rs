//! Configuration management for the Ledger Live starter.
//!
//! This module defines the structure of the `config.json` file (Ledger Live path,
//! parameters and presets) and the `ConfigStore` that resolves where it lives,
//! loads it, and writes it back.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "LEDGER_LIVE_STARTER_CONFIG";
const CONFIG_DIR_NAME: &str = ".ledger-live";
const CONFIG_FILE_NAME: &str = "config.json";

/// Top-level configuration structure corresponding to `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path of the ledger-live checkout; empty means the current directory.
    #[serde(rename = "ledger-live-path", default)]
    pub ledger_live_path: String,
    /// Selectable parameters, in display order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Vec<Parameter>,
    /// Saved presets, in display order. Omitted on disk when empty.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub presets: Vec<Preset>,
}

/// A named environment variable assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Display name, unique among parameters.
    pub name: String,
    /// Assignment in `KEY=VALUE` form.
    pub env_var: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: String,
}

/// A saved platform + parameter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Display name, unique among presets.
    pub name: String,
    /// Raw platform key ("mobile" or "desktop"). Kept as written so unknown
    /// values survive a load/save cycle.
    #[serde(default)]
    pub platform: String,
    /// Names of the parameters to apply. May reference deleted parameters.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Vec<String>,
}

/// Target variant of the launched application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Mobile,
    Desktop,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Mobile, Platform::Desktop];

    /// Maps a stored platform key to a platform. Anything unrecognized is mobile.
    pub fn from_key(key: &str) -> Self {
        match key {
            "desktop" => Platform::Desktop,
            "mobile" => Platform::Mobile,
            other => {
                debug!(platform = other, "unknown platform key, defaulting to mobile");
                Platform::Mobile
            }
        }
    }

    pub const fn key(&self) -> &'static str {
        match self {
            Platform::Mobile => "mobile",
            Platform::Desktop => "desktop",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Platform::Mobile => "Mobile",
            Platform::Desktop => "Desktop",
        }
    }

    /// Package-manager invocation that starts the dev build for this platform.
    pub const fn base_command(&self) -> &'static str {
        match self {
            Platform::Mobile => "pnpm dev:llm",
            Platform::Desktop => "pnpm dev:lld",
        }
    }
}

/// Errors that can occur while loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file exists at the resolved path.
    #[error("no configuration found at {path}")]
    NotFound { path: PathBuf },
    /// The file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file was read but is not a valid configuration document.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The configuration could not be serialized.
    #[error("failed to encode configuration: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    /// Creating the directory or writing the file failed.
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Whether the file on disk exists but holds something we could not use.
    /// Overwriting it would discard user data.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, ConfigError::Read { .. } | ConfigError::Parse { .. })
    }
}

/// Owns the location of the configuration file and performs all I/O on it.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Builds a store from an optional `--config` value and the process environment.
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        let path = resolve_config_path(
            explicit,
            std::env::var_os(CONFIG_PATH_ENV),
            dirs::home_dir(),
        );
        debug!(path = %path.display(), "resolved config path");
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads and parses the configuration file.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            parameters = config.parameters.len(),
            presets = config.presets.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Overwrites the configuration file with `config`, creating its directory first.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let mut serialized =
            serde_json::to_string_pretty(config).map_err(|source| ConfigError::Encode { source })?;
        serialized.push('\n');
        self.ensure_dir()?;
        fs::write(&self.path, serialized).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "saved config");
        Ok(())
    }

    /// Creates the directory that will contain the configuration file.
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Resolve config path in the order: CLI override → env var → `~/.ledger-live/config.json`.
///
/// Empty values count as unset. Without a home directory the file is looked up
/// in the current directory.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    env_value: Option<OsString>,
    home: Option<PathBuf>,
) -> PathBuf {
    explicit
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| {
            env_value
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| match home {
            Some(home) => home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            None => PathBuf::from(CONFIG_FILE_NAME),
        })
}

/// Configuration used when nothing has been set up yet.
pub fn default_config() -> Config {
    Config {
        ledger_live_path: String::new(),
        parameters: vec![
            Parameter {
                name: "Skip onboarding".to_string(),
                env_var: "SKIP_ONBOARDING=1".to_string(),
                description: "Enable skipping the onboarding process on mobile".to_string(),
            },
            Parameter {
                name: "Disable transaction broadcast".to_string(),
                env_var: "DISABLE_TRANSACTION_BROADCAST=1".to_string(),
                description: "Disable broadcasting transactions and directly get success"
                    .to_string(),
            },
            Parameter {
                name: "Bypass CORS".to_string(),
                env_var: "BYPASS_CORS=1".to_string(),
                description: "Bypass CORS restrictions for local development".to_string(),
            },
        ],
        presets: Vec::new(),
    }
}

// Older config files carry `null` for empty lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
