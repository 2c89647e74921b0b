//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::cookie::presented_credentials;
use crate::web::error::HttpError;
use crate::web::state::AppState;

/// Middleware that resolves the caller's identity from the session cookie or the
/// bearer header.
///
/// If resolution succeeds, inserts the `Identity` into request extensions for
/// handlers to use. Otherwise returns 401 without saying which check failed.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    // 1. Pull whatever credentials the request carries
    let presented = presented_credentials(req.headers());

    // 2. Resolve them in precedence order
    let identity = state.auth.authenticate(&presented).await?;

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(identity);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
