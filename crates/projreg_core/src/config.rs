//! Runtime configuration for the registry core.
//!
//! # Responsibility
//! - Collect database, logging and cycle policy settings in one place.
//! - Load settings from `PROJREG_*` environment variables with defaults.
//!
//! # Invariants
//! - Unset variables fall back to defaults; malformed values are errors.

use crate::cycle::{CyclePolicy, CyclePolicyError};
use crate::logging::default_log_level;
use log::info;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "PROJREG_DB";
pub const ENV_LOG_LEVEL: &str = "PROJREG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PROJREG_LOG_DIR";
pub const ENV_ROLLOVER_MONTHS: &str = "PROJREG_ROLLOVER_MONTHS";

const DEFAULT_DB_FILE_NAME: &str = "projreg.sqlite3";

/// Configuration load error.
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable holds non-UTF-8 data.
    NotUnicode(&'static str),
    InvalidRolloverMonths {
        key: &'static str,
        source: CyclePolicyError,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotUnicode(key) => write!(f, "{key} is not valid unicode"),
            Self::InvalidRolloverMonths { key, source } => write!(f, "invalid {key}: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotUnicode(_) => None,
            Self::InvalidRolloverMonths { source, .. } => Some(source),
        }
    }
}

/// Settings shared by the CLI driver and embedding callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file holding the corpus.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub cycle_policy: CyclePolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let defaults = Self::default();
        let read = |key: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => {
                    info!("event=config_load module=config status=default key={key}");
                    Ok(None)
                }
                Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
            }
        };

        let cycle_policy = match read(ENV_ROLLOVER_MONTHS)? {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidRolloverMonths {
                    key: ENV_ROLLOVER_MONTHS,
                    source,
                })?,
            None => defaults.cycle_policy,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH)?
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL)?.unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR)?
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            cycle_policy,
        })
    }
}
