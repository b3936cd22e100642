use std::env;
use std::fmt;
use std::time::Duration;

/// `DATABASE_URL` value that selects the in-memory store instead of Postgres.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Accepted range for `JWT_EXPIRES_IN_DAYS`.
pub const TOKEN_LIFETIME_DAYS: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Tried on every other connection attempt when set.
    pub database_fallback_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_attempts: u32,
    pub db_retry_delay: Duration,
    pub jwt_secret: String,
    pub jwt_expires_in_days: i64,
    pub bcrypt_cost: u32,
    pub server_port: u16,
    pub server_host: String,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/task_tracker".to_string()),
            database_fallback_url: non_empty("DATABASE_FALLBACK_URL"),
            db_max_connections: parse_or(&non_empty, "DB_MAX_CONNECTIONS", 10)?,
            db_connect_attempts: parse_or(&non_empty, "DB_CONNECT_ATTEMPTS", 3)?,
            db_retry_delay: Duration::from_secs(parse_or(&non_empty, "DB_RETRY_DELAY_SECS", 2)?),
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_expires_in_days: parse_in_range(
                &non_empty,
                "JWT_EXPIRES_IN_DAYS",
                7,
                TOKEN_LIFETIME_DAYS,
            )?,
            bcrypt_cost: parse_or(&non_empty, "BCRYPT_COST", 10)?,
            server_port: parse_or(&non_empty, "SERVER_PORT", 5000)?,
            server_host: non_empty("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    /// Connection strings in the order they are tried.
    pub fn database_candidates(&self) -> Vec<String> {
        let mut candidates = vec![self.database_url.clone()];
        if let Some(fallback) = &self.database_fallback_url {
            candidates.push(fallback.clone());
        }
        candidates
    }

    pub fn uses_memory_database(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_in_range<F>(
    lookup: &F,
    key: &'static str,
    default: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}
