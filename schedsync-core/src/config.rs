//! Configuration for a sync run.
//!
//! Values are layered: built-in defaults, then `~/.config/schedsync/config.toml`,
//! then an explicit file, then `SCHEDSYNC__SECTION__KEY` environment variables
//! (a `.env` file in the working directory is read first).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::date_range::MAX_WINDOW_DAYS;
use crate::error::{SyncError, SyncResult};
use crate::retry::RetryPolicy;

const ENV_PREFIX: &str = "SCHEDSYNC";
const ENV_SEPARATOR: &str = "__";

/// Delay before the first schedule fetch retry.
const SOURCE_BASE_DELAY: Duration = Duration::from_secs(1);
const SOURCE_MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub scraping: ScrapingConfig,
    pub calendar: CalendarConfig,
    pub source: SourceConfig,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Total fetch attempts before the source is declared unavailable.
    pub max_retries: u32,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    pub default_building: String,
    pub default_group: String,
    /// Days mirrored when no explicit range is given.
    pub window_days: i64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        ScrapingConfig {
            max_retries: 3,
            timeout_ms: 15_000,
            default_building: "Н".to_string(),
            default_group: "БИК2404".to_string(),
            window_days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    /// Name of the `schedsync-provider-<name>` executable.
    pub provider: String,
    pub calendar_name: String,
    pub time_zone: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            calendar_id: None,
            provider: "google".to_string(),
            calendar_name: "МТУСИ Расписание".to_string(),
            time_zone: "Europe/Moscow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Name of the `schedsync-source-<name>` executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// JSON snapshot used instead of a live source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub concurrency: usize,
    pub requests_per_second: f64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            concurrency: 4,
            requests_per_second: 5.0,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: 0.5,
        }
    }
}

impl From<&ExecutorConfig> for RetryPolicy {
    fn from(config: &ExecutorConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl SyncConfig {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("schedsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default file, `explicit` (must exist when given) and
    /// the process environment.
    pub fn load(explicit: Option<&Path>) -> SyncResult<Self> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let default_path = Self::config_path()?;
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);

        Self::load_layered(Some(&default_path), explicit, env)
    }

    fn load_layered(default_path: Option<&Path>, explicit: Option<&Path>, env: Environment) -> SyncResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = default_path {
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: SyncConfig = builder
            .add_source(env)
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        self.time_zone()?;

        if self.executor.concurrency == 0 {
            return Err(SyncError::Config("executor.concurrency must be at least 1".into()));
        }
        if self.executor.max_attempts == 0 {
            return Err(SyncError::Config("executor.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.executor.jitter) {
            return Err(SyncError::Config("executor.jitter must be between 0 and 1".into()));
        }
        if self.executor.requests_per_second < 0.0 {
            return Err(SyncError::Config("executor.requests_per_second must not be negative".into()));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.scraping.window_days) {
            return Err(SyncError::Config(format!(
                "scraping.window_days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }
        if self.source.provider.is_some() && self.source.file.is_some() {
            return Err(SyncError::Config(
                "source.provider and source.file are mutually exclusive".into(),
            ));
        }

        Ok(())
    }

    pub fn time_zone(&self) -> SyncResult<chrono_tz::Tz> {
        self.calendar
            .time_zone
            .parse()
            .map_err(|_| SyncError::Config(format!("Unknown time zone '{}'", self.calendar.time_zone)))
    }

    pub fn calendar_id(&self) -> SyncResult<&str> {
        self.calendar
            .calendar_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SyncError::Config(
                    "calendar.calendar_id is not set (SCHEDSYNC__CALENDAR__CALENDAR_ID)".into(),
                )
            })
    }

    /// Retry policy for the schedule fetch.
    pub fn source_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.scraping.max_retries.max(1),
            base_delay: SOURCE_BASE_DELAY,
            max_delay: SOURCE_MAX_DELAY,
            jitter: self.executor.jitter,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.scraping.timeout_ms)
    }

    /// Write a config file holding every default.
    pub fn write_default(path: &Path) -> SyncResult<()> {
        let content = toml::to_string_pretty(&SyncConfig::default())
            .map_err(|e| SyncError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, format!("# schedsync configuration\n\n{content}"))
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
