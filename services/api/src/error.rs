//! services/api/src/error.rs
//!
//! Errors that can stop the server from starting or serving. Request-level
//! failures are `web::error::HttpError` instead.

use crate::config::ConfigError;
use plume_core::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pool creation or connection failure.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The auth layer refused its settings, e.g. out-of-range argon2 costs.
    #[error("Auth setup error: {0}")]
    AuthSetup(#[from] AuthError),

    /// Binding the listener or serving connections.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
