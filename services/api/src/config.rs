//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Upper bound on session and token lifetimes (ten years).
const MAX_SESSION_TTL_DAYS: i64 = 3650;
const MAX_TOKEN_AGE_SECS: i64 = MAX_SESSION_TTL_DAYS * 24 * 3600;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where users and sessions are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreBackend,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub log_level: Level,
    pub auth_secret: String,
    /// The key that signed tokens before the last rotation, still accepted.
    pub auth_secret_previous: Option<String>,
    pub session_ttl: chrono::Duration,
    /// `None` keeps the legacy behaviour of tokens that never expire.
    pub token_max_age: Option<chrono::Duration>,
    pub cookie_secure: bool,
    pub revoke_on_logout: bool,
    pub store_timeout: Duration,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Store Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let store = match backend.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: var("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let db_max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", 20u32)?;
        let db_min_connections = parse_or(&var, "DB_MIN_CONNECTIONS", 2u32)?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Auth Settings ---
        let auth_secret = var("AUTH_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("AUTH_SECRET".to_string()))?;
        let auth_secret_previous = var("AUTH_SECRET_PREVIOUS").filter(|s| !s.is_empty());

        let ttl_days = parse_or(&var, "SESSION_TTL_DAYS", 30i64)?;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl_days) {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                format!("must be between 1 and {}", MAX_SESSION_TTL_DAYS),
            ));
        }
        let session_ttl = chrono::Duration::try_days(ttl_days).ok_or_else(|| {
            ConfigError::InvalidValue("SESSION_TTL_DAYS".to_string(), "out of range".to_string())
        })?;

        let max_age_secs = parse_or(&var, "TOKEN_MAX_AGE_SECS", 30 * 24 * 3600i64)?;
        let token_max_age = match max_age_secs {
            0 => None,
            n if (1..=MAX_TOKEN_AGE_SECS).contains(&n) => {
                Some(chrono::Duration::try_seconds(n).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "TOKEN_MAX_AGE_SECS".to_string(),
                        "out of range".to_string(),
                    )
                })?)
            }
            _ => {
                return Err(ConfigError::InvalidValue(
                    "TOKEN_MAX_AGE_SECS".to_string(),
                    format!("must be 0 or between 1 and {}", MAX_TOKEN_AGE_SECS),
                ))
            }
        };

        let cookie_secure = parse_or(&var, "COOKIE_SECURE", false)?;
        let revoke_on_logout = parse_or(&var, "REVOKE_ON_LOGOUT", false)?;
        let store_timeout = Duration::from_millis(parse_or(&var, "STORE_TIMEOUT_MS", 5000u64)?);

        let argon2_memory_kib = parse_or(&var, "ARGON2_MEMORY_KIB", 19 * 1024u32)?;
        let argon2_iterations = parse_or(&var, "ARGON2_ITERATIONS", 2u32)?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_address,
            store,
            db_max_connections,
            db_min_connections,
            log_level,
            auth_secret,
            auth_secret_previous,
            session_ttl,
            token_max_age,
            cookie_secure,
            revoke_on_logout,
            store_timeout,
            argon2_memory_kib,
            argon2_iterations,
            cors_origins,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
