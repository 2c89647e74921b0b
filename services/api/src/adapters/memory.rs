//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. Used for local runs with
//! `STORE_BACKEND=memory` and by the test suites. State is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plume_core::domain::{Project, User, UserCredentials, UserId};
use plume_core::ports::{CredentialStore, PortError, PortResult, ProjectStore, SessionStore};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredSession {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    next_user_id: i64,
    next_project_id: i64,
    users: Vec<UserCredentials>,
    sessions: HashMap<String, StoredSession>,
    projects: Vec<Project>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn has_session_hash(&self, token_hash: &str) -> bool {
        self.state.read().await.sessions.contains_key(token_hash)
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        // The write lock makes check-and-insert atomic, like a unique index.
        let mut state = self.state.write().await;
        if state.users.iter().any(|c| c.user.email == email) {
            return Err(PortError::Conflict(format!("email {} already registered", email)));
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId(state.next_user_id),
            public_id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.users.push(UserCredentials {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let state = self.state.read().await;
        state
            .users
            .iter()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound("user with that email".to_string()))
    }

    async fn find_by_public_id(&self, public_id: Uuid) -> PortResult<User> {
        let state = self.state.read().await;
        state
            .users
            .iter()
            .find(|c| c.user.public_id == public_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", public_id)))
    }

    async fn find_by_id(&self, id: UserId) -> PortResult<User> {
        let state = self.state.read().await;
        state
            .users
            .iter()
            .find(|c| c.user.id == id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User #{} not found", id.0)))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut state = self.state.write().await;
        if state.sessions.contains_key(token_hash) {
            return Err(PortError::Conflict("session hash collision".to_string()));
        }
        state.sessions.insert(
            token_hash.to_string(),
            StoredSession {
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_active_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> PortResult<UserId> {
        let state = self.state.read().await;
        state
            .sessions
            .get(token_hash)
            .filter(|s| s.expires_at > now)
            .map(|s| s.user_id)
            .ok_or_else(|| PortError::NotFound("active session".to_string()))
    }

    async fn revoke_session(&self, token_hash: &str) -> PortResult<bool> {
        Ok(self.state.write().await.sessions.remove(token_hash).is_some())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(
        &self,
        owner: UserId,
        title: &str,
        description: &str,
    ) -> PortResult<Project> {
        let mut state = self.state.write().await;
        state.next_project_id += 1;
        let project = Project {
            id: state.next_project_id,
            public_id: Uuid::new_v4(),
            owner,
            title: title.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self, owner: UserId) -> PortResult<Vec<Project>> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .iter()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect())
    }

    async fn get_project(&self, owner: UserId, public_id: Uuid) -> PortResult<Project> {
        let state = self.state.read().await;
        state
            .projects
            .iter()
            .find(|p| p.owner == owner && p.public_id == public_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", public_id)))
    }
}
