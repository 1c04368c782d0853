//! Settings read from the process environment once at startup.

use chrono::FixedOffset;
use std::env;
use std::fmt;
use std::time::Duration;
use tenko_protocol::client::DEFAULT_API_URL;
use thiserror::Error;

pub const LOGIN_VAR: &str = "LOGIN";
pub const PASSWORD_VAR: &str = "PASSWORD";
pub const API_URL_VAR: &str = "TENKO_API_URL";
pub const UTC_OFFSET_VAR: &str = "TENKO_UTC_OFFSET_HOURS";
pub const TICK_VAR: &str = "TENKO_TICK_SECS";

/// The boiler site is assumed to be at UTC+2 all year round.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 2;
pub const DEFAULT_TICK_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Login and password must be set ({0} is missing or empty)")]
    Missing(&'static str),

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub login: &'a str,
    pub password: &'a str,
}

#[derive(Clone)]
pub struct Settings {
    login: Option<String>,
    password: Option<String>,
    pub api_url: String,
    pub utc_offset: FixedOffset,
    pub tick: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Settings, ConfigError> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset optional keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Optional keys that are set but blank count as unset.
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = optional(API_URL_VAR)
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());

        let offset = optional(UTC_OFFSET_VAR).unwrap_or_else(|| DEFAULT_UTC_OFFSET_HOURS.to_string());
        let utc_offset = offset
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(hours_offset)
            .ok_or_else(|| ConfigError::Invalid {
                key: UTC_OFFSET_VAR,
                value: offset.clone(),
                reason: "expected whole hours between -23 and 23",
            })?;

        let tick = match optional(TICK_VAR) {
            None => Duration::from_secs(DEFAULT_TICK_SECS),
            Some(value) => {
                let secs = value.trim().parse::<u64>().unwrap_or(0);
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: TICK_VAR,
                        value,
                        reason: "expected a positive number of seconds",
                    });
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Settings {
            login: lookup(LOGIN_VAR),
            password: lookup(PASSWORD_VAR),
            api_url,
            utc_offset,
            tick,
        })
    }

    /// Login and password, both non-empty.
    pub fn credentials(&self) -> Result<Credentials<'_>, ConfigError> {
        let login = non_empty(&self.login).ok_or(ConfigError::Missing(LOGIN_VAR))?;
        let password = non_empty(&self.password).ok_or(ConfigError::Missing(PASSWORD_VAR))?;
        Ok(Credentials { login, password })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn hours_offset(hours: i32) -> Option<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return None;
    }
    FixedOffset::east_opt(hours * 3600)
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("utc_offset", &self.utc_offset)
            .field("tick", &self.tick)
            .finish()
    }
}
