pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{
    AuthMechanism, Identity, IssuedSession, Project, TokenClaims, User, UserCredentials, UserId,
};
pub use error::{AuthError, AuthResult};
pub use ports::{CredentialStore, PortError, PortResult, ProjectStore, SessionStore};
