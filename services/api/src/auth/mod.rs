//! services/api/src/auth/mod.rs
//!
//! The authentication subsystem: password hashing, opaque sessions, stateless
//! bearer tokens, and the resolver that turns presented credentials into an
//! identity. Nothing in here knows about HTTP.

pub mod password;
pub mod resolver;
pub mod service;
pub mod session;
pub mod token;

pub use password::PasswordHasher;
pub use resolver::{
    BearerTokenResolver, CredentialResolver, IdentityResolver, PresentedCredentials,
    SessionCookieResolver,
};
pub use service::{AuthService, AuthSettings, AuthenticatedUser, LoginOutcome};
pub use session::SessionManager;
pub use token::{SigningKeys, TokenCodec};

use plume_core::ports::{PortError, PortResult};
use std::future::Future;
use std::time::Duration;

/// Runs a store call with an upper bound on how long it may take.
///
/// When the limit elapses the inner future is dropped, which cancels the call.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Unexpected(format!(
            "store call timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
