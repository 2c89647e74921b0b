//! crates/plume_core/src/ports.rs
//!
//! Defines the storage contracts (traits) the auth layer and the thin CRUD
//! collaborators depend on. Adapters in the `api` service implement them.

use crate::domain::{Project, User, UserCredentials, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a user. A taken email must surface as `PortError::Conflict`.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User>;

    async fn find_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn find_by_public_id(&self, public_id: Uuid) -> PortResult<User>;

    async fn find_by_id(&self, id: UserId) -> PortResult<User>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of the session with this hash if `expires_at > now`.
    /// A missing row and an expired row both yield `PortError::NotFound`.
    async fn find_active_session(&self, token_hash: &str, now: DateTime<Utc>)
        -> PortResult<UserId>;

    /// Deletes the session with this hash. Returns whether a row was removed.
    async fn revoke_session(&self, token_hash: &str) -> PortResult<bool>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(
        &self,
        owner: UserId,
        title: &str,
        description: &str,
    ) -> PortResult<Project>;

    async fn list_projects(&self, owner: UserId) -> PortResult<Vec<Project>>;

    /// Looks a project up by public id, scoped to its owner.
    async fn get_project(&self, owner: UserId, public_id: Uuid) -> PortResult<Project>;
}
