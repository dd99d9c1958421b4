//! Configuration from environment variables.
//!
//! Variables are read through an injected lookup function, so tests build
//! configs from a map instead of mutating the process environment. Blank
//! values count as unset.

use std::env::VarError;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load `.env` if present, then read the process environment.
///
/// # Errors
///
/// Returns [`ConfigError`] if a required variable is missing or a value does
/// not parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    AppConfig::from_lookup(|key| std::env::var(key))
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &str) -> Result<String, ConfigError> {
        self.get(var)
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn text_or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.get(var) else {
            return Ok(default);
        };
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("'{raw}': {e}"),
        })
    }
}

impl AppConfig {
    /// Build a config from `lookup`, which behaves like [`std::env::var`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingEnvVar`] without `DATABASE_URL`;
    /// [`ConfigError::InvalidEnvVar`] for unparsable numbers or addresses.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let env = EnvSource { lookup };
        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            env: Environment::from_name(&env.text_or("ECONBRIEF_ENV", "development")),
            bind_addr: env.parsed_or(
                "ECONBRIEF_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 3000)),
            )?,
            log_level: env.text_or("ECONBRIEF_LOG_LEVEL", "info"),
            db_max_connections: env.parsed_or("ECONBRIEF_DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: env.parsed_or("ECONBRIEF_DB_MIN_CONNECTIONS", 1)?,
            db_acquire_timeout_secs: env.parsed_or("ECONBRIEF_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
            rate_limit_max_requests: env.parsed_or("ECONBRIEF_RATE_LIMIT_MAX_REQUESTS", 120)?,
            rate_limit_window_secs: env.parsed_or("ECONBRIEF_RATE_LIMIT_WINDOW_SECS", 60)?,
        })
    }
}
