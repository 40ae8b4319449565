//! Runtime configuration resolved from the process environment.
//!
//! # Responsibility
//! - Resolve database location, logging options and calendar settings.
//! - Report malformed values with the offending variable name.
//!
//! # Invariants
//! - Blank variables behave exactly like unset variables.
//! - `utc_offset_minutes` stays within -14h..=+14h.

use crate::logging::default_log_level;
use crate::time::{LocalCalendar, WeekStart};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "FITTRACK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FITTRACK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FITTRACK_LOG_DIR";
pub const ENV_UTC_OFFSET_MINUTES: &str = "FITTRACK_UTC_OFFSET_MINUTES";
pub const ENV_WEEK_START: &str = "FITTRACK_WEEK_START";

const DEFAULT_DB_FILE_NAME: &str = "fittrack.sqlite3";
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                expected,
            } => write!(f, "invalid {variable} value `{value}`; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub utc_offset_minutes: i32,
    pub week_start: WeekStart,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            utc_offset_minutes: 0,
            week_start: WeekStart::Monday,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from `FITTRACK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        if let Some(raw) = read(ENV_UTC_OFFSET_MINUTES) {
            config.utc_offset_minutes = raw
                .parse::<i32>()
                .ok()
                .filter(|value| value.abs() <= MAX_UTC_OFFSET_MINUTES)
                .ok_or(ConfigError::InvalidValue {
                    variable: ENV_UTC_OFFSET_MINUTES,
                    value: raw,
                    expected: "integer minutes within -840..=840",
                })?;
        }

        if let Some(raw) = read(ENV_WEEK_START) {
            config.week_start = WeekStart::parse(&raw).ok_or(ConfigError::InvalidValue {
                variable: ENV_WEEK_START,
                value: raw,
                expected: "monday|sunday",
            })?;
        }

        Ok(config)
    }

    pub fn calendar(&self) -> LocalCalendar {
        LocalCalendar::new(self.utc_offset_minutes, self.week_start)
    }
}
