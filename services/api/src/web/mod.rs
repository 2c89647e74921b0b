pub mod auth;
pub mod cookie;
pub mod error;
pub mod middleware;
pub mod projects;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the pieces the binary needs to build the web server.
pub use middleware::require_auth;
pub use router::create_router;
pub use state::AppState;
