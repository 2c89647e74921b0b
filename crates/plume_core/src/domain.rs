//! crates/plume_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Internal storage key of a user. Never leaves the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub public_id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// An opaque session handed to the client exactly once, at issue time.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

/// The claims carried by a stateless bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub public_id: Uuid,
    pub email: String,
    pub issued_at: i64,
}

/// Which credential proved the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    SessionCookie,
    BearerToken,
}

/// The answer to "who made this request".
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub mechanism: AuthMechanism,
}

/// A writing project owned by a single user.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub public_id: Uuid,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
