//! services/api/src/auth/token.rs
//!
//! Stateless bearer tokens for clients that predate cookie sessions.
//!
//! Wire format, all base64url without padding:
//!
//! ```text
//! token = b64( public_id "|" email "|" unix_ts "|" b64( HMAC-SHA256(key, public_id "|" email "|" unix_ts) ) )
//! ```
//!
//! The email is readable by anyone holding the token. Tokens cannot be revoked
//! individually; they stop verifying once they exceed the configured max age or
//! once the key that signed them is retired.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use plume_core::{AuthError, AuthResult, TokenClaims};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const DELIMITER: char = '|';

/// Tokens stamped this far in the future are still accepted, to absorb clock skew
/// between replicas.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// The MAC keys in use.
///
/// Rotation: deploy with `previous` set to the old key and `current` set to the
/// new one. Tokens signed by either verify. Once every token signed with the old
/// key has aged out, drop `previous`.
#[derive(Clone)]
pub struct SigningKeys {
    current: Vec<u8>,
    previous: Option<Vec<u8>>,
}

impl SigningKeys {
    pub fn new(current: impl Into<Vec<u8>>, previous: Option<Vec<u8>>) -> Self {
        Self {
            current: current.into(),
            previous,
        }
    }

    fn verification_order(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.current.as_slice()).chain(self.previous.as_deref())
    }
}

// Keys must never end up in logs.
impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field("previous", &self.previous.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct TokenCodec {
    keys: SigningKeys,
    max_age: Option<Duration>,
}

impl TokenCodec {
    /// `max_age` of `None` means tokens never expire while their key is accepted.
    pub fn new(keys: SigningKeys, max_age: Option<Duration>) -> Self {
        Self { keys, max_age }
    }

    pub fn issue(&self, public_id: Uuid, email: &str) -> AuthResult<String> {
        self.issue_at(public_id, email, Utc::now())
    }

    pub fn issue_at(&self, public_id: Uuid, email: &str, now: DateTime<Utc>) -> AuthResult<String> {
        if email.contains(DELIMITER) {
            return Err(AuthError::Validation(
                "email must not contain '|'".to_string(),
            ));
        }
        let payload = format!("{}|{}|{}", public_id, email, now.timestamp());
        let signature = sign(&self.keys.current, &payload)?;
        let raw = format!("{}|{}", payload, URL_SAFE_NO_PAD.encode(signature));
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Every rejection collapses to `AuthenticationFailure`; the reason is only
    /// logged at debug level.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        self.decode(token, now).map_err(|reason| {
            debug!(reason, "bearer token rejected");
            AuthError::AuthenticationFailure
        })
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, &'static str> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| "outer encoding")?;
        let raw = String::from_utf8(raw).map_err(|_| "not utf-8")?;

        let parts: Vec<&str> = raw.split(DELIMITER).collect();
        let [public_id, email, issued_at, signature] = parts.as_slice() else {
            return Err("field count");
        };

        let payload = format!("{}|{}|{}", public_id, email, issued_at);
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| "signature encoding")?;

        let authentic = self.keys.verification_order().any(|key| {
            HmacSha256::new_from_slice(key)
                .map(|mut mac| {
                    mac.update(payload.as_bytes());
                    mac.verify_slice(&signature).is_ok()
                })
                .unwrap_or(false)
        });
        if !authentic {
            return Err("signature mismatch");
        }

        let public_id = Uuid::parse_str(public_id).map_err(|_| "public id")?;
        let issued_at: i64 = issued_at.parse().map_err(|_| "timestamp")?;

        if let Some(max_age) = self.max_age {
            let age = now.timestamp() - issued_at;
            if age > max_age.num_seconds() {
                return Err("expired");
            }
            if age < -MAX_CLOCK_SKEW_SECS {
                return Err("issued in the future");
            }
        }

        Ok(TokenClaims {
            public_id,
            email: (*email).to_string(),
            issued_at,
        })
    }
}

fn sign(key: &[u8], payload: &str) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuthError::Hash(format!("invalid MAC key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
