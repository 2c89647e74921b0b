//! services/api/src/auth/password.rs
//!
//! Argon2id password hashing. Work runs on tokio's blocking pool so a slow hash
//! never stalls the request executor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use plume_core::{AuthError, AuthResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, warn};

/// Hashes and verifies user passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password under the same cost parameters, used to keep
    /// the "unknown user" path as slow as the "wrong password" path.
    dummy: Arc<OnceCell<Option<String>>>,
}

impl PasswordHasher {
    /// Creates a hasher with the given memory cost (KiB) and iteration count.
    pub fn new(memory_kib: u32, iterations: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AuthError::Hash(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy: Arc::new(OnceCell::new()),
        })
    }

    /// Produces a salted PHC-format hash of `plaintext`.
    pub async fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let argon2 = self.argon2.clone();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| {
                    error!("Failed to hash password: {:?}", e);
                    AuthError::Hash(e.to_string())
                })
        })
        .await
        .map_err(|e| AuthError::Hash(format!("hashing task failed: {e}")))?
    }

    /// Checks `plaintext` against a stored hash. Every failure, including an
    /// unparseable stored hash, reads as a mismatch.
    pub async fn verify(&self, stored_hash: &str, plaintext: &str) -> bool {
        let argon2 = self.argon2.clone();
        let stored_hash = stored_hash.to_owned();
        let plaintext = plaintext.to_owned();
        let outcome = tokio::task::spawn_blocking(move || {
            let parsed = match PasswordHash::new(&stored_hash) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Stored password hash could not be parsed: {:?}", e);
                    return false;
                }
            };
            argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
        .await;

        outcome.unwrap_or_else(|e| {
            error!("Password verification task failed: {:?}", e);
            false
        })
    }

    /// Burns roughly one verification's worth of CPU. Called when the account
    /// does not exist.
    pub async fn verify_dummy(&self, plaintext: &str) {
        let dummy = self
            .dummy
            .get_or_init(|| async { self.hash("plume-dummy-password").await.ok() })
            .await;
        if let Some(dummy) = dummy {
            let _ = self.verify(dummy, plaintext).await;
        }
    }
}
