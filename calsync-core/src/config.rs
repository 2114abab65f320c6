//! calsync configuration.
//!
//! Read from `~/.config/calsync/config.toml` (optional), then overridden by
//! `CALSYNC_`-prefixed environment variables, e.g. `CALSYNC_STORE__API_KEY`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{DEFAULT_LOCALE, DEFAULT_MAX_OCCURRENCES, DEFAULT_TITLE};
use crate::error::{SyncError, SyncResult};
use crate::sync::SyncOptions;

static DEFAULT_HORIZON: &str = "365days";
static DEFAULT_LOOKBACK: &str = "30days";

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_horizon() -> String {
    DEFAULT_HORIZON.to_string()
}

fn default_lookback() -> String {
    DEFAULT_LOOKBACK.to_string()
}

fn default_max_occurrences() -> u16 {
    DEFAULT_MAX_OCCURRENCES
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_collection() -> String {
    "events".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Firestore,
}

/// Where events are persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    pub project_id: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    pub api_key: Option<String>,

    /// Override the REST endpoint (e.g. a local emulator).
    pub base_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::default(),
            project_id: None,
            database: default_database(),
            collection: default_collection(),
            api_key: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_locale")]
    pub locale: String,

    /// IANA timezone used for display.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_title")]
    pub default_title: String,

    /// How far ahead unbounded recurring events are expanded (e.g. "365days", "12weeks").
    #[serde(default = "default_horizon")]
    pub horizon: String,

    /// How far back unbounded recurring events are expanded.
    #[serde(default = "default_lookback")]
    pub lookback: String,

    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: u16,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            locale: default_locale(),
            timezone: default_timezone(),
            default_title: default_title(),
            horizon: default_horizon(),
            lookback: default_lookback(),
            max_occurrences: default_max_occurrences(),
            store: StoreConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default config path plus environment overrides.
    pub fn load() -> SyncResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path` (which may not exist) plus environment overrides.
    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let config: SyncConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CALSYNC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SyncResult<()> {
        self.horizon_duration()?;
        self.lookback_duration()?;
        self.timezone()?;
        if self.default_title.trim().is_empty() {
            return Err(SyncError::Config("default_title must not be empty".into()));
        }
        Ok(())
    }

    pub fn horizon_duration(&self) -> SyncResult<Duration> {
        parse_span("horizon", &self.horizon)
    }

    pub fn lookback_duration(&self) -> SyncResult<Duration> {
        parse_span("lookback", &self.lookback)
    }

    pub fn timezone(&self) -> SyncResult<chrono_tz::Tz> {
        chrono_tz::Tz::from_str(&self.timezone)
            .map_err(|_| SyncError::Config(format!("Unknown timezone '{}'", self.timezone)))
    }

    pub fn sync_options(&self) -> SyncResult<SyncOptions> {
        Ok(SyncOptions {
            horizon: self.horizon_duration()?,
            lookback: self.lookback_duration()?,
            max_occurrences: self.max_occurrences,
            default_title: self.default_title.clone(),
            locale: self.locale.clone(),
        })
    }
}

fn parse_span(key: &str, value: &str) -> SyncResult<Duration> {
    let std_duration = humantime::parse_duration(value)
        .map_err(|e| SyncError::Config(format!("Invalid {} '{}': {}", key, value, e)))?;
    Duration::from_std(std_duration)
        .map_err(|_| SyncError::Config(format!("{} too large: {}", key, value)))
}
