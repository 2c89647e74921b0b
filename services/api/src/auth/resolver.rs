//! services/api/src/auth/resolver.rs
//!
//! Request-time identity resolution.
//!
//! Precedence policy v1:
//!   1. opaque session secret from the `auth` cookie
//!   2. stateless token from `Authorization: Bearer`
//!
//! The first resolver that produces a user wins. A caller presenting a valid
//! cookie and a valid bearer token is identified through the cookie. New
//! mechanisms are added by implementing `CredentialResolver` and inserting the
//! resolver into the list; call sites never change.

use crate::auth::{bounded, SessionManager, TokenCodec};
use async_trait::async_trait;
use plume_core::ports::{CredentialStore, PortError};
use plume_core::{AuthError, AuthMechanism, AuthResult, Identity, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The raw credentials a request carried, already pulled out of the transport.
#[derive(Debug, Clone, Default)]
pub struct PresentedCredentials {
    pub session_secret: Option<String>,
    pub bearer_token: Option<String>,
}

/// One way of proving who the caller is.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    fn mechanism(&self) -> AuthMechanism;

    /// `Ok(None)` when the request does not carry this kind of credential,
    /// `Ok(Some(_))` when it proves an identity, `Err(_)` when it is present but
    /// does not check out.
    async fn resolve(&self, presented: &PresentedCredentials) -> AuthResult<Option<User>>;
}

/// Tries each resolver in order and stops at the first success.
#[derive(Clone)]
pub struct IdentityResolver {
    resolvers: Vec<Arc<dyn CredentialResolver>>,
}

impl IdentityResolver {
    pub fn new(resolvers: Vec<Arc<dyn CredentialResolver>>) -> Self {
        Self { resolvers }
    }

    /// Per-mechanism failures are logged and swallowed; the caller only ever sees
    /// `AuthenticationFailure`.
    pub async fn authenticate(&self, presented: &PresentedCredentials) -> AuthResult<Identity> {
        for resolver in &self.resolvers {
            let mechanism = resolver.mechanism();
            match resolver.resolve(presented).await {
                Ok(Some(user)) => return Ok(Identity { user, mechanism }),
                Ok(None) => {}
                Err(e) if e.is_internal() => {
                    warn!(?mechanism, "credential resolution failed: {}", e);
                }
                Err(_) => debug!(?mechanism, "credential rejected"),
            }
        }
        Err(AuthError::AuthenticationFailure)
    }
}

/// Resolves the `auth` cookie through the session store.
pub struct SessionCookieResolver {
    sessions: SessionManager,
    users: Arc<dyn CredentialStore>,
    store_timeout: Duration,
}

impl SessionCookieResolver {
    pub fn new(sessions: SessionManager, users: Arc<dyn CredentialStore>, store_timeout: Duration) -> Self {
        Self {
            sessions,
            users,
            store_timeout,
        }
    }
}

#[async_trait]
impl CredentialResolver for SessionCookieResolver {
    fn mechanism(&self) -> AuthMechanism {
        AuthMechanism::SessionCookie
    }

    async fn resolve(&self, presented: &PresentedCredentials) -> AuthResult<Option<User>> {
        let Some(secret) = presented.session_secret.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let user_id = self.sessions.resolve(secret).await?;
        let user = bounded(self.store_timeout, self.users.find_by_id(user_id))
            .await
            .map_err(not_found_is_failure)?;
        Ok(Some(user))
    }
}

/// Resolves `Authorization: Bearer` tokens. The token's email must still match
/// the stored account.
pub struct BearerTokenResolver {
    tokens: TokenCodec,
    users: Arc<dyn CredentialStore>,
    store_timeout: Duration,
}

impl BearerTokenResolver {
    pub fn new(tokens: TokenCodec, users: Arc<dyn CredentialStore>, store_timeout: Duration) -> Self {
        Self {
            tokens,
            users,
            store_timeout,
        }
    }
}

#[async_trait]
impl CredentialResolver for BearerTokenResolver {
    fn mechanism(&self) -> AuthMechanism {
        AuthMechanism::BearerToken
    }

    async fn resolve(&self, presented: &PresentedCredentials) -> AuthResult<Option<User>> {
        let Some(token) = presented.bearer_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let claims = self.tokens.verify(token)?;
        let user = bounded(self.store_timeout, self.users.find_by_public_id(claims.public_id))
            .await
            .map_err(not_found_is_failure)?;
        if user.email != claims.email {
            return Err(AuthError::AuthenticationFailure);
        }
        Ok(Some(user))
    }
}

fn not_found_is_failure(err: PortError) -> AuthError {
    match err {
        PortError::NotFound(_) => AuthError::AuthenticationFailure,
        other => AuthError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::auth::SigningKeys;
    use chrono::Utc;
    use uuid::Uuid;

    const TIMEOUT: Duration = Duration::from_secs(1);

    struct Fixture {
        resolver: IdentityResolver,
        sessions: SessionManager,
        tokens: TokenCodec,
        ana: User,
        bob: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ana = store.create_user("ana", "ana@x.com", "h").await.unwrap();
        let bob = store.create_user("bob", "bob@x.com", "h").await.unwrap();

        let sessions = SessionManager::new(store.clone(), chrono::Duration::days(30), TIMEOUT);
        let tokens = TokenCodec::new(SigningKeys::new(b"k".to_vec(), None), None);
        let precedence: Vec<Arc<dyn CredentialResolver>> = vec![
            Arc::new(SessionCookieResolver::new(sessions.clone(), store.clone(), TIMEOUT)),
            Arc::new(BearerTokenResolver::new(tokens.clone(), store.clone(), TIMEOUT)),
        ];
        let resolver = IdentityResolver::new(precedence);
        Fixture {
            resolver,
            sessions,
            tokens,
            ana,
            bob,
        }
    }

    #[tokio::test]
    async fn cookie_wins_when_both_credentials_are_valid() {
        let f = fixture().await;
        let session = f.sessions.issue(f.ana.id).await.unwrap();
        let token = f.tokens.issue(f.bob.public_id, &f.bob.email).unwrap();

        let identity = f
            .resolver
            .authenticate(&PresentedCredentials {
                session_secret: Some(session.secret),
                bearer_token: Some(token),
            })
            .await
            .unwrap();

        assert_eq!(identity.mechanism, AuthMechanism::SessionCookie);
        assert_eq!(identity.user.public_id, f.ana.public_id);
    }

    #[tokio::test]
    async fn bearer_is_used_when_the_cookie_fails() {
        let f = fixture().await;
        let token = f.tokens.issue(f.bob.public_id, &f.bob.email).unwrap();

        let identity = f
            .resolver
            .authenticate(&PresentedCredentials {
                session_secret: Some("stale-or-forged".to_string()),
                bearer_token: Some(token),
            })
            .await
            .unwrap();

        assert_eq!(identity.mechanism, AuthMechanism::BearerToken);
        assert_eq!(identity.user.username, "bob");
    }

    #[tokio::test]
    async fn expired_cookie_falls_back_to_bearer() {
        let f = fixture().await;
        let expired = f
            .sessions
            .issue_at(f.ana.id, Utc::now() - chrono::Duration::days(31))
            .await
            .unwrap();
        let token = f.tokens.issue(f.ana.public_id, &f.ana.email).unwrap();

        let identity = f
            .resolver
            .authenticate(&PresentedCredentials {
                session_secret: Some(expired.secret),
                bearer_token: Some(token),
            })
            .await
            .unwrap();
        assert_eq!(identity.mechanism, AuthMechanism::BearerToken);
    }

    #[tokio::test]
    async fn nothing_presented_is_unauthenticated() {
        let f = fixture().await;
        let result = f.resolver.authenticate(&PresentedCredentials::default()).await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailure)));
    }

    #[tokio::test]
    async fn token_for_unknown_user_or_changed_email_is_rejected() {
        let f = fixture().await;
        let ghost = f.tokens.issue(Uuid::new_v4(), "ghost@x.com").unwrap();
        let mismatched = f.tokens.issue(f.ana.public_id, "other@x.com").unwrap();

        for token in [ghost, mismatched] {
            let result = f
                .resolver
                .authenticate(&PresentedCredentials {
                    session_secret: None,
                    bearer_token: Some(token),
                })
                .await;
            assert!(matches!(result, Err(AuthError::AuthenticationFailure)));
        }
    }

    #[tokio::test]
    async fn empty_resolver_list_rejects_everything() {
        let f = fixture().await;
        let session = f.sessions.issue(f.ana.id).await.unwrap();
        let resolver = IdentityResolver::new(Vec::new());

        let result = resolver
            .authenticate(&PresentedCredentials {
                session_secret: Some(session.secret),
                bearer_token: None,
            })
            .await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailure)));
    }
}
