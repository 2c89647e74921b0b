//! services/api/src/auth/service.rs
//!
//! The register / login / authenticate / logout use cases. HTTP handlers are thin
//! adapters over this type.

use crate::auth::{
    bounded, BearerTokenResolver, CredentialResolver, IdentityResolver, PasswordHasher,
    PresentedCredentials, SessionCookieResolver, SessionManager, SigningKeys, TokenCodec,
};
use crate::config::Config;
use plume_core::ports::{CredentialStore, PortError, SessionStore};
use plume_core::{AuthError, AuthResult, Identity, IssuedSession, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// The knobs the auth layer needs, split out of `Config` so tests can build one
/// directly.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub signing_keys: SigningKeys,
    pub token_max_age: Option<chrono::Duration>,
    pub session_ttl: chrono::Duration,
    pub store_timeout: Duration,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub revoke_on_logout: bool,
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            signing_keys: SigningKeys::new(
                config.auth_secret.as_bytes().to_vec(),
                config
                    .auth_secret_previous
                    .as_ref()
                    .map(|s| s.as_bytes().to_vec()),
            ),
            token_max_age: config.token_max_age,
            session_ttl: config.session_ttl,
            store_timeout: config.store_timeout,
            argon2_memory_kib: config.argon2_memory_kib,
            argon2_iterations: config.argon2_iterations,
            revoke_on_logout: config.revoke_on_logout,
        }
    }
}

/// A user plus the stateless token minted for them.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
    pub session: IssuedSession,
}

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    sessions: SessionManager,
    tokens: TokenCodec,
    resolver: IdentityResolver,
    store_timeout: Duration,
    revoke_on_logout: bool,
}

impl AuthService {
    pub fn new(
        settings: AuthSettings,
        users: Arc<dyn CredentialStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::new(settings.argon2_memory_kib, settings.argon2_iterations)?;
        let sessions = SessionManager::new(session_store, settings.session_ttl, settings.store_timeout);
        let tokens = TokenCodec::new(settings.signing_keys, settings.token_max_age);

        let precedence: Vec<Arc<dyn CredentialResolver>> = vec![
            Arc::new(SessionCookieResolver::new(
                sessions.clone(),
                users.clone(),
                settings.store_timeout,
            )),
            Arc::new(BearerTokenResolver::new(
                tokens.clone(),
                users.clone(),
                settings.store_timeout,
            )),
        ];
        let resolver = IdentityResolver::new(precedence);

        Ok(Self {
            users,
            hasher,
            sessions,
            tokens,
            resolver,
            store_timeout: settings.store_timeout,
            revoke_on_logout: settings.revoke_on_logout,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.sessions.ttl()
    }

    /// Creates an account. The store's unique constraint is the only arbiter of
    /// duplicate emails.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthenticatedUser> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email and password required".to_string(),
            ));
        }
        if email.contains('|') {
            return Err(AuthError::Validation(
                "email must not contain '|'".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(password).await?;

        let user = bounded(
            self.store_timeout,
            self.users.create_user(username.trim(), email, &password_hash),
        )
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => AuthError::DuplicateEmail,
            other => {
                error!("Failed to create user: {:?}", other);
                AuthError::from(other)
            }
        })?;
        info!(user = %user.public_id, "user registered");

        let token = self.tokens.issue(user.public_id, &user.email)?;
        Ok(AuthenticatedUser { user, token })
    }

    /// Verifies credentials and issues both a session and a stateless token.
    /// Unknown email and wrong password are the same failure.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "email and password required".to_string(),
            ));
        }

        let credentials = match bounded(self.store_timeout, self.users.find_by_email(email)).await {
            Ok(credentials) => credentials,
            Err(PortError::NotFound(_)) => {
                self.hasher.verify_dummy(password).await;
                return Err(AuthError::AuthenticationFailure);
            }
            Err(e) => {
                error!("Failed to look up user: {:?}", e);
                return Err(AuthError::from(e));
            }
        };

        if !self.hasher.verify(&credentials.password_hash, password).await {
            return Err(AuthError::AuthenticationFailure);
        }

        // Token first: a failure here must not leave a live session behind.
        let user = credentials.user;
        let token = self.tokens.issue(user.public_id, &user.email)?;
        let session = self.sessions.issue(user.id).await?;
        info!(user = %user.public_id, "user logged in");

        Ok(LoginOutcome {
            user,
            token,
            session,
        })
    }

    pub async fn authenticate(&self, presented: &PresentedCredentials) -> AuthResult<Identity> {
        self.resolver.authenticate(presented).await
    }

    /// The cookie is cleared by the caller. The server-side row is only deleted
    /// when revoke-on-logout is enabled; otherwise it lives until it expires.
    pub async fn logout(&self, session_secret: Option<&str>) -> AuthResult<()> {
        if !self.revoke_on_logout {
            return Ok(());
        }
        if let Some(secret) = session_secret.filter(|s| !s.is_empty()) {
            self.sessions.revoke(secret).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use plume_core::ports::PortResult;
    use plume_core::{AuthMechanism, UserCredentials, UserId};
    use std::sync::Mutex;
    use uuid::Uuid;

    fn settings(revoke_on_logout: bool) -> AuthSettings {
        AuthSettings {
            signing_keys: SigningKeys::new(b"unit-test-key".to_vec(), None),
            token_max_age: Some(chrono::Duration::days(30)),
            session_ttl: chrono::Duration::days(30),
            store_timeout: Duration::from_secs(1),
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            revoke_on_logout,
        }
    }

    fn service(revoke_on_logout: bool) -> AuthService {
        let store = Arc::new(MemoryStore::new());
        AuthService::new(settings(revoke_on_logout), store.clone(), store).unwrap()
    }

    fn with_cookie(secret: &str) -> PresentedCredentials {
        PresentedCredentials {
            session_secret: Some(secret.to_string()),
            bearer_token: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let auth = service(false);

        let registered = auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();
        assert_eq!(registered.user.username, "ana");
        assert!(!registered.token.is_empty());

        let login = auth.login("ana@x.com", "s3cr3t!").await.unwrap();
        assert_eq!(login.user.public_id, registered.user.public_id);
        assert!(!login.session.secret.is_empty());

        let identity = auth.authenticate(&with_cookie(&login.session.secret)).await.unwrap();
        assert_eq!(identity.user.email, "ana@x.com");
        assert_eq!(identity.mechanism, AuthMechanism::SessionCookie);
    }

    #[tokio::test]
    async fn registration_token_authenticates_as_bearer() {
        let auth = service(false);
        let registered = auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();

        let identity = auth
            .authenticate(&PresentedCredentials {
                session_secret: None,
                bearer_token: Some(registered.token),
            })
            .await
            .unwrap();
        assert_eq!(identity.mechanism, AuthMechanism::BearerToken);
        assert_eq!(identity.user.public_id, registered.user.public_id);
    }

    #[tokio::test]
    async fn duplicate_email_is_its_own_error() {
        let auth = service(false);
        auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();

        let err = auth.register("other", "ana@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let auth = service(false);
        for (email, password) in [("", "pw"), ("ana@x.com", ""), ("   ", "pw")] {
            assert!(matches!(
                auth.register("ana", email, password).await,
                Err(AuthError::Validation(_))
            ));
            assert!(matches!(
                auth.login(email, password).await,
                Err(AuthError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let auth = service(false);
        auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();

        let wrong = auth.login("ana@x.com", "wrong").await.unwrap_err();
        let unknown = auth.login("nobody@x.com", "s3cr3t!").await.unwrap_err();

        assert!(matches!(wrong, AuthError::AuthenticationFailure));
        assert!(matches!(unknown, AuthError::AuthenticationFailure));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn logout_keeps_the_session_row_by_default() {
        let auth = service(false);
        auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();
        let login = auth.login("ana@x.com", "s3cr3t!").await.unwrap();

        auth.logout(Some(&login.session.secret)).await.unwrap();
        assert!(auth.authenticate(&with_cookie(&login.session.secret)).await.is_ok());
    }

    #[tokio::test]
    async fn logout_revokes_only_that_session_when_enabled() {
        let auth = service(true);
        auth.register("ana", "ana@x.com", "s3cr3t!").await.unwrap();
        let laptop = auth.login("ana@x.com", "s3cr3t!").await.unwrap();
        let phone = auth.login("ana@x.com", "s3cr3t!").await.unwrap();

        auth.logout(Some(&laptop.session.secret)).await.unwrap();

        assert!(auth.authenticate(&with_cookie(&laptop.session.secret)).await.is_err());
        assert!(auth.authenticate(&with_cookie(&phone.session.secret)).await.is_ok());
    }

    //=====================================================================================
    // Stores that fail or stall on demand
    //=====================================================================================

    #[derive(Clone, Copy)]
    enum Health {
        Up,
        Down,
        Stalled,
    }

    /// Wraps a `MemoryStore`; each half can be switched to fail or hang.
    struct FlakyStore {
        inner: MemoryStore,
        users: Mutex<Health>,
        sessions: Mutex<Health>,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                users: Mutex::new(Health::Up),
                sessions: Mutex::new(Health::Up),
            }
        }

        fn set_users(&self, health: Health) {
            *self.users.lock().unwrap() = health;
        }

        fn set_sessions(&self, health: Health) {
            *self.sessions.lock().unwrap() = health;
        }
    }

    async fn gate(health: &Mutex<Health>) -> PortResult<()> {
        let health = *health.lock().unwrap();
        match health {
            Health::Up => Ok(()),
            Health::Down => Err(PortError::Unexpected("connection refused".to_string())),
            Health::Stalled => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CredentialStore for FlakyStore {
        async fn create_user(&self, username: &str, email: &str, hash: &str) -> PortResult<User> {
            gate(&self.users).await?;
            self.inner.create_user(username, email, hash).await
        }

        async fn find_by_email(&self, email: &str) -> PortResult<UserCredentials> {
            gate(&self.users).await?;
            self.inner.find_by_email(email).await
        }

        async fn find_by_public_id(&self, public_id: Uuid) -> PortResult<User> {
            gate(&self.users).await?;
            self.inner.find_by_public_id(public_id).await
        }

        async fn find_by_id(&self, id: UserId) -> PortResult<User> {
            gate(&self.users).await?;
            self.inner.find_by_id(id).await
        }
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn insert_session(
            &self,
            user_id: UserId,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> PortResult<()> {
            gate(&self.sessions).await?;
            self.inner.insert_session(user_id, token_hash, expires_at).await
        }

        async fn find_active_session(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> PortResult<UserId> {
            gate(&self.sessions).await?;
            self.inner.find_active_session(token_hash, now).await
        }

        async fn revoke_session(&self, token_hash: &str) -> PortResult<bool> {
            gate(&self.sessions).await?;
            self.inner.revoke_session(token_hash).await
        }
    }

    fn flaky_service(store_timeout: Duration) -> (AuthService, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::new());
        let settings = AuthSettings {
            store_timeout,
            ..settings(false)
        };
        let auth = AuthService::new(settings, store.clone(), store.clone()).unwrap();
        (auth, store)
    }

    #[tokio::test]
    async fn failing_user_store_is_a_store_error() {
        let (auth, store) = flaky_service(Duration::from_secs(1));
        auth.register("ana", "ana@x.com", "pw").await.unwrap();
        store.set_users(Health::Down);

        let err = auth.register("bob", "bob@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));

        // A broken lookup is not the caller's fault, so it is not a 401.
        let err = auth.login("ana@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn failing_session_write_fails_login() {
        let (auth, store) = flaky_service(Duration::from_secs(1));
        auth.register("ana", "ana@x.com", "pw").await.unwrap();
        store.set_sessions(Health::Down);

        let err = auth.login("ana@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn stalled_store_times_out_as_a_store_error() {
        let (auth, store) = flaky_service(Duration::from_millis(50));
        auth.register("ana", "ana@x.com", "pw").await.unwrap();

        store.set_users(Health::Stalled);
        let login = tokio::time::timeout(Duration::from_secs(5), auth.login("ana@x.com", "pw"))
            .await
            .expect("login should give up at the store timeout");
        assert!(matches!(login, Err(AuthError::Store(ref m)) if m.contains("timed out")));

        store.set_users(Health::Up);
        store.set_sessions(Health::Stalled);
        let login = tokio::time::timeout(Duration::from_secs(5), auth.login("ana@x.com", "pw"))
            .await
            .expect("session insert should give up at the store timeout");
        assert!(matches!(login, Err(AuthError::Store(_))));
    }

    #[tokio::test]
    async fn failing_session_store_leaves_the_caller_unauthenticated() {
        let (auth, store) = flaky_service(Duration::from_millis(50));
        auth.register("ana", "ana@x.com", "pw").await.unwrap();
        let login = auth.login("ana@x.com", "pw").await.unwrap();

        for health in [Health::Down, Health::Stalled] {
            store.set_sessions(health);
            let err = auth
                .authenticate(&with_cookie(&login.session.secret))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::AuthenticationFailure));
        }
    }

    #[tokio::test]
    async fn login_leaves_no_session_when_the_token_cannot_be_issued() {
        let store = Arc::new(MemoryStore::new());
        let hash = PasswordHasher::new(1024, 1).unwrap().hash("pw").await.unwrap();
        // Written straight to the store, as an account created before '|' was refused.
        store.create_user("old", "old|timer@x.com", &hash).await.unwrap();
        let auth = AuthService::new(settings(false), store.clone(), store.clone()).unwrap();

        let err = auth.login("old|timer@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(store.session_count().await, 0);
    }
}
