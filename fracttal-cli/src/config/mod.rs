//! Configuration for the updater
//!
//! Settings come from an optional TOML file; credentials always come from the
//! environment (see [`credentials`]).

pub mod credentials;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::resilience::RetryConfig;
use crate::pipeline::CategoryRules;

pub use credentials::Credentials;

const CONFIG_DIR: &str = "fracttal-cli";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub report: ReportLayout,
    pub categories: CategoryRules,
}

/// Remote endpoints and transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub auth_url: String,
    pub base_url: String,
    /// Offset applied to reading timestamps, in whole hours east of UTC
    pub utc_offset_hours: i32,
    /// Request timeout; unset means the HTTP client default
    pub timeout_secs: Option<u64>,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

/// Where the interesting columns live in the activity report
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    /// 1-based row holding the column headers
    pub header_row: u32,
    pub id_column: String,
    pub category_column: String,
    pub distance_column: String,
    pub running_time_column: String,
    pub status_column: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://one.fracttal.com/oauth/token".to_string(),
            base_url: "https://app.fracttal.com".to_string(),
            utc_offset_hours: -3,
            timeout_secs: None,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 500,
        }
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            header_row: 9,
            id_column: "Interno".to_string(),
            category_column: "Categoría".to_string(),
            distance_column: "Km".to_string(),
            running_time_column: "Tiempo de marcha".to_string(),
            status_column: "Estado".to_string(),
        }
    }
}

impl ApiConfig {
    /// Fixed offset used when stamping meter readings
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).with_context(|| {
            format!("Invalid UTC offset: {} hours", self.utc_offset_hours)
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(self.retry.max_attempts)
            .delay(Duration::from_millis(self.retry.delay_ms))
            .build()
    }
}

impl ReportLayout {
    /// 0-based sheet row of the header
    pub fn header_index(&self) -> u32 {
        self.header_row.saturating_sub(1)
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.report.header_row == 0 {
            anyhow::bail!("report.header_row is 1-based and must be at least 1");
        }
        if self.api.retry.max_attempts == 0 {
            anyhow::bail!("api.retry.max_attempts must be at least 1");
        }
        self.api.utc_offset()?;
        Ok(())
    }
}

/// `<config dir>/fracttal-cli/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
