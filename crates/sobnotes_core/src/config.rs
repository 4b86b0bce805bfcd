//! Process configuration from environment variables.
//!
//! # Responsibility
//! - Read `.env` plus process environment into one typed `AppConfig`.
//! - Keep variable names and defaults in a single place.
//!
//! # Invariants
//! - Missing generation credentials are not a config error; they surface as
//!   `GenerationError::Config` when a generation is attempted.
//! - Malformed values are rejected instead of silently replaced by defaults.

use crate::generation::gigachat::{self, GigaChatSettings};
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names.
pub mod env_vars {
    pub const DATA_FILE: &str = "SOBNOTES_DATA_FILE";
    pub const SEARCH_RESET_SECS: &str = "SOBNOTES_SEARCH_RESET_SECS";
    pub const OPEN_MATCH_SECS: &str = "SOBNOTES_OPEN_MATCH_SECS";
    pub const LOG_LEVEL: &str = "SOBNOTES_LOG_LEVEL";
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub const LOG_DIR: &str = "SOBNOTES_LOG_DIR";
    pub const GIGACHAT_CREDENTIALS: &str = "GIGACHAT_CREDENTIALS";
    pub const GIGACHAT_CLIENT_SECRET: &str = "GIGACHAT_CLIENT_SECRET";
    pub const GIGACHAT_SCOPE: &str = "GIGACHAT_SCOPE";
    pub const GIGACHAT_MODEL: &str = "GIGACHAT_MODEL";
    pub const GIGACHAT_OAUTH_URL: &str = "GIGACHAT_OAUTH_URL";
    pub const GIGACHAT_CHAT_URL: &str = "GIGACHAT_CHAT_URL";
    pub const GIGACHAT_ACCEPT_INVALID_CERTS: &str = "GIGACHAT_ACCEPT_INVALID_CERTS";
}

/// Default values.
pub mod defaults {
    pub const DATA_FILE: &str = "data/notes.json";
    pub const SEARCH_RESET_SECS: u64 = 5;
    pub const OPEN_MATCH_SECS: u64 = 3;
    /// Upper bound for any debounce interval (one day).
    pub const MAX_INTERVAL_SECS: u64 = 86_400;
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {key}; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Debounce intervals used by the interaction controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Quiet period after which the search field is cleared.
    pub search_reset: Duration,
    /// Quiet period after which the top match is opened.
    pub open_top_match: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            search_reset: Duration::from_secs(defaults::SEARCH_RESET_SECS),
            open_top_match: Duration::from_secs(defaults::OPEN_MATCH_SECS),
        }
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub controller: ControllerSettings,
    pub gigachat: GigaChatSettings,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let controller = ControllerSettings {
            search_reset: parse_secs(
                env_vars::SEARCH_RESET_SECS,
                get(env_vars::SEARCH_RESET_SECS),
                defaults::SEARCH_RESET_SECS,
            )?,
            open_top_match: parse_secs(
                env_vars::OPEN_MATCH_SECS,
                get(env_vars::OPEN_MATCH_SECS),
                defaults::OPEN_MATCH_SECS,
            )?,
        };

        let gigachat = GigaChatSettings {
            credentials: get(env_vars::GIGACHAT_CREDENTIALS),
            client_secret: get(env_vars::GIGACHAT_CLIENT_SECRET),
            scope: get(env_vars::GIGACHAT_SCOPE)
                .unwrap_or_else(|| gigachat::DEFAULT_SCOPE.to_string()),
            model: get(env_vars::GIGACHAT_MODEL)
                .unwrap_or_else(|| gigachat::DEFAULT_MODEL.to_string()),
            oauth_url: get(env_vars::GIGACHAT_OAUTH_URL)
                .unwrap_or_else(|| gigachat::DEFAULT_OAUTH_URL.to_string()),
            chat_url: get(env_vars::GIGACHAT_CHAT_URL)
                .unwrap_or_else(|| gigachat::DEFAULT_CHAT_URL.to_string()),
            accept_invalid_certs: parse_bool(
                env_vars::GIGACHAT_ACCEPT_INVALID_CERTS,
                get(env_vars::GIGACHAT_ACCEPT_INVALID_CERTS),
            )?,
            ..GigaChatSettings::default()
        };

        Ok(Self {
            data_file: PathBuf::from(
                get(env_vars::DATA_FILE).unwrap_or_else(|| defaults::DATA_FILE.to_string()),
            ),
            log_level: get(env_vars::LOG_LEVEL)
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(env_vars::LOG_DIR),
            controller,
            gigachat,
        })
    }
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> ConfigResult<Duration> {
    let Some(value) = raw else {
        return Ok(Duration::from_secs(default));
    };
    match value.parse::<u64>() {
        Ok(secs) if (1..=defaults::MAX_INTERVAL_SECS).contains(&secs) => {
            Ok(Duration::from_secs(secs))
        }
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            expected: "a number of seconds between 1 and 86400",
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> ConfigResult<bool> {
    let Some(value) = raw else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            expected: "true|false",
        }),
    }
}
