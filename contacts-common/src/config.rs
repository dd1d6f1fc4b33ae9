//! Configuration loading and resolution
//!
//! Settings are resolved once at startup in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is not an error; the service starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Environment variable names
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_CHANNEL_URL: &str = "CHANNEL_URL";
pub const ENV_MODE: &str = "MODE";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_POLL_INTERVAL_MS: &str = "RELAY_POLL_INTERVAL_MS";
pub const ENV_API_PREFIX: &str = "API_PREFIX";
pub const ENV_CONFIG_FILE: &str = "CONTACTS_CONFIG";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://contacts.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
    Test,
}

impl Mode {
    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Mode::Development => "contacts_api=debug,contacts_common=debug,tower_http=debug",
            Mode::Production => "contacts_api=info,contacts_common=info,tower_http=info",
            Mode::Test => "warn",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            "test" => Ok(Mode::Test),
            other => Err(Error::Config(format!("Unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::Test => "test",
        };
        f.write_str(name)
    }
}

/// Optional settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    pub channel_url: Option<String>,
    pub mode: Option<String>,
    pub bind_addr: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub api_prefix: Option<String>,
}

impl TomlConfig {
    /// Load a TOML settings file
    ///
    /// Returns `Ok(None)` when the file does not exist. A file that exists
    /// but cannot be parsed is a configuration error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_url: Option<String>,
    pub channel_url: Option<String>,
    pub mode: Option<String>,
    pub bind_addr: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub api_prefix: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Record store connection string
    pub database_url: String,
    /// Change channel connection string
    pub channel_url: String,
    pub mode: Mode,
    pub bind_addr: String,
    /// Relay poll interval
    pub poll_interval: Duration,
    /// Route prefix for the contacts/history API, e.g. `/v2`
    pub api_prefix: Option<String>,
}

/// Resolves [`ServiceConfig`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli: CliOverrides,
}

impl ConfigResolver {
    pub fn new(cli: CliOverrides) -> Self {
        Self { cli }
    }

    pub fn resolve(&self) -> Result<ServiceConfig> {
        let toml_config = match self.config_file_path() {
            Some(path) => match TomlConfig::load(&path)? {
                Some(config) => config,
                None => {
                    warn!("Config file {} not found, using defaults", path.display());
                    TomlConfig::default()
                }
            },
            None => TomlConfig::default(),
        };

        let database_url = pick(
            self.cli.database_url.clone(),
            ENV_DATABASE_URL,
            toml_config.database_url,
        )
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        // The channel shares the record store unless pointed elsewhere
        let channel_url = pick(
            self.cli.channel_url.clone(),
            ENV_CHANNEL_URL,
            toml_config.channel_url,
        )
        .unwrap_or_else(|| database_url.clone());

        let mode = match pick(self.cli.mode.clone(), ENV_MODE, toml_config.mode) {
            Some(value) => value.parse()?,
            None => Mode::default(),
        };

        let bind_addr = pick(self.cli.bind_addr.clone(), ENV_BIND_ADDR, toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let poll_interval_ms = match self.cli.poll_interval_ms {
            Some(ms) => ms,
            None => match env_value(ENV_POLL_INTERVAL_MS) {
                Some(raw) => raw.parse().map_err(|e| {
                    Error::Config(format!("Invalid {}='{}': {}", ENV_POLL_INTERVAL_MS, raw, e))
                })?,
                None => toml_config.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            },
        };
        if poll_interval_ms == 0 {
            return Err(Error::Config("Poll interval must be greater than zero".to_string()));
        }

        let api_prefix = pick(self.cli.api_prefix.clone(), ENV_API_PREFIX, toml_config.api_prefix)
            .and_then(|prefix| normalize_prefix(&prefix));

        Ok(ServiceConfig {
            database_url,
            channel_url,
            mode,
            bind_addr,
            poll_interval: Duration::from_millis(poll_interval_ms),
            api_prefix,
        })
    }

    fn config_file_path(&self) -> Option<PathBuf> {
        self.cli
            .config_file
            .clone()
            .or_else(|| env_value(ENV_CONFIG_FILE).map(PathBuf::from))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn pick(cli: Option<String>, env_name: &str, file: Option<String>) -> Option<String> {
    cli.or_else(|| env_value(env_name)).or(file)
}

/// `"v2/"` and `"/v2"` both become `"/v2"`; `"/"` and `""` mean no prefix
fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}
