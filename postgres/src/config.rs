//! Connection settings for the order database.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading [`PostgresConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Environment variable name.
        name: &'static str,
        /// Value as found.
        value: String,
    },
}

/// `PostgreSQL` connection settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database server host
    pub host: String,
    /// Database server port
    pub port: u16,
    /// Login role
    pub user: String,
    /// Login password
    pub password: String,
    /// Database holding the order tables
    pub database: String,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "food_orders".to_string(),
            connect_timeout: 30,
        }
    }
}

impl PostgresConfig {
    /// Load configuration from `FOOD_ORDER_DB_*` environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `FOOD_ORDER_DB_HOST` | `localhost` |
    /// | `FOOD_ORDER_DB_PORT` | `5432` |
    /// | `FOOD_ORDER_DB_USER` | `postgres` |
    /// | `FOOD_ORDER_DB_PASSWORD` | empty |
    /// | `FOOD_ORDER_DB_NAME` | `food_orders` |
    /// | `FOOD_ORDER_DB_CONNECT_TIMEOUT` | `30` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: lookup("FOOD_ORDER_DB_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "FOOD_ORDER_DB_PORT")?.unwrap_or(defaults.port),
            user: lookup("FOOD_ORDER_DB_USER").unwrap_or(defaults.user),
            password: lookup("FOOD_ORDER_DB_PASSWORD").unwrap_or(defaults.password),
            database: lookup("FOOD_ORDER_DB_NAME").unwrap_or(defaults.database),
            connect_timeout: parse_var(&lookup, "FOOD_ORDER_DB_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.connect_timeout),
        })
    }

    /// Connection timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Driver options for a single connection.
    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name("food-order")
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
