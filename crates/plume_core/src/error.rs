//! crates/plume_core/src/error.rs
//!
//! The error taxonomy shared by every layer of the auth subsystem. It carries no
//! transport concerns; the web layer decides how each kind is encoded.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("Email is already registered")]
    DuplicateEmail,

    /// Bad credentials, an unknown or expired session, or an unverifiable token.
    /// Deliberately carries no detail.
    #[error("Invalid credentials")]
    AuthenticationFailure,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Hash error: {0}")]
    Hash(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Only `register` knows that a conflict means a taken email, and it maps that
/// case itself. Any other conflict is a store fault.
impl From<PortError> for AuthError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Conflict(what) => AuthError::Store(format!("conflict: {what}")),
            PortError::NotFound(what) => AuthError::Store(format!("not found: {what}")),
            PortError::Unexpected(msg) => AuthError::Store(msg),
        }
    }
}

impl AuthError {
    /// Whether this error is the service's fault rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Store(_) | AuthError::Hash(_))
    }
}
