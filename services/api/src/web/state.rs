//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::auth::AuthService;
use crate::config::Config;
use plume_core::ports::ProjectStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub projects: Arc<dyn ProjectStore>,
    pub config: Arc<Config>,
}
