//! services/api/src/auth/session.rs
//!
//! Opaque, server-side sessions. The client holds a random secret; the store
//! only ever sees its SHA-256 digest.

use crate::auth::bounded;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use plume_core::ports::{PortError, SessionStore};
use plume_core::{AuthError, AuthResult, IssuedSession, UserId};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error};

/// Secret length before encoding (32 bytes = 256 bits).
const SECRET_BYTES: usize = 32;

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    store_timeout: std::time::Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration, store_timeout: std::time::Duration) -> Self {
        Self {
            store,
            ttl,
            store_timeout,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(&self, user_id: UserId) -> AuthResult<IssuedSession> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// Creates a session and returns its secret. This is the only time the
    /// plaintext secret exists on the server.
    pub async fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> AuthResult<IssuedSession> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            error!("Session lifetime {} overflows the clock", self.ttl);
            AuthError::Store("session expiry out of range".to_string())
        })?;
        let secret = generate_secret();

        bounded(
            self.store_timeout,
            self.store.insert_session(user_id, &hash_secret(&secret), expires_at),
        )
        .await
        .map_err(|e| {
            error!("Failed to create session: {:?}", e);
            AuthError::from(e)
        })?;

        Ok(IssuedSession { secret, expires_at })
    }

    pub async fn resolve(&self, secret: &str) -> AuthResult<UserId> {
        self.resolve_at(secret, Utc::now()).await
    }

    /// Maps a presented secret to its owner. Unknown and expired secrets are
    /// indistinguishable; store failures stay `Store` errors.
    pub async fn resolve_at(&self, secret: &str, now: DateTime<Utc>) -> AuthResult<UserId> {
        if secret.is_empty() {
            return Err(AuthError::AuthenticationFailure);
        }
        match bounded(
            self.store_timeout,
            self.store.find_active_session(&hash_secret(secret), now),
        )
        .await
        {
            Ok(user_id) => Ok(user_id),
            Err(PortError::NotFound(_)) => {
                debug!("session secret did not match an active session");
                Err(AuthError::AuthenticationFailure)
            }
            Err(e) => Err(AuthError::from(e)),
        }
    }

    /// Deletes the server-side row for `secret`. Other sessions of the same
    /// user are untouched.
    pub async fn revoke(&self, secret: &str) -> AuthResult<bool> {
        let removed = bounded(self.store_timeout, self.store.revoke_session(&hash_secret(secret)))
            .await
            .map_err(AuthError::from)?;
        Ok(removed)
    }
}

fn generate_secret() -> String {
    let bytes: [u8; SECRET_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The value persisted in place of the secret.
pub fn hash_secret(secret: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use plume_core::ports::CredentialStore;

    async fn setup() -> (SessionManager, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user("ana", "ana@x.com", "$argon2id$stub")
            .await
            .unwrap();
        let manager = SessionManager::new(
            store.clone(),
            Duration::days(30),
            std::time::Duration::from_secs(1),
        );
        (manager, store, user.id)
    }

    #[tokio::test]
    async fn issued_secret_resolves_until_expiry() {
        let (manager, _, user_id) = setup().await;
        let now = Utc::now();

        let session = manager.issue_at(user_id, now).await.unwrap();
        assert_eq!(session.expires_at, now + Duration::days(30));

        let just_before = session.expires_at - Duration::seconds(1);
        assert_eq!(manager.resolve_at(&session.secret, just_before).await.unwrap(), user_id);

        // Valid iff expires_at > now, so the expiry instant itself is already invalid.
        assert!(matches!(
            manager.resolve_at(&session.secret, session.expires_at).await,
            Err(AuthError::AuthenticationFailure)
        ));
    }

    #[tokio::test]
    async fn secrets_are_high_entropy_and_never_stored() {
        let (manager, store, user_id) = setup().await;
        let session = manager.issue(user_id).await.unwrap();

        assert_eq!(session.secret.len(), 43);
        assert!(!store.has_session_hash(&session.secret).await);
        assert!(store.has_session_hash(&hash_secret(&session.secret)).await);
    }

    #[tokio::test]
    async fn two_sessions_are_independent() {
        let (manager, _, user_id) = setup().await;
        let now = Utc::now();

        let first = manager.issue_at(user_id, now).await.unwrap();
        let second = manager.issue_at(user_id, now + Duration::days(1)).await.unwrap();
        assert_ne!(first.secret, second.secret);

        // The first expires a day before the second.
        let between = first.expires_at + Duration::hours(1);
        assert!(manager.resolve_at(&first.secret, between).await.is_err());
        assert_eq!(manager.resolve_at(&second.secret, between).await.unwrap(), user_id);

        // Revoking one leaves the other valid.
        assert!(manager.revoke(&second.secret).await.unwrap());
        assert!(manager.resolve_at(&second.secret, now).await.is_err());
        assert_eq!(manager.resolve_at(&first.secret, now).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn unknown_and_empty_secrets_fail_alike() {
        let (manager, _, _) = setup().await;
        for secret in ["", "never-issued"] {
            assert!(matches!(
                manager.resolve(secret).await,
                Err(AuthError::AuthenticationFailure)
            ));
        }
        assert!(!manager.revoke("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn expiry_overflow_is_an_error_not_a_panic() {
        let (_, store, user_id) = setup().await;
        let manager = SessionManager::new(
            store.clone(),
            Duration::days(1_000_000_000),
            std::time::Duration::from_secs(1),
        );

        let err = manager.issue(user_id).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(store.session_count().await, 0);
    }

    #[test]
    fn hash_is_deterministic_and_url_safe() {
        let a = hash_secret("abc");
        assert_eq!(a, hash_secret("abc"));
        assert_ne!(a, hash_secret("abd"));
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
