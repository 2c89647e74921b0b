//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

use crate::web::cookie::{cleared_session_cookie, presented_credentials, session_cookie};
use crate::web::error::{ErrorResponse, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use plume_core::{AuthError, Identity, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    /// The user's public identifier.
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Stateless bearer token for clients that do not keep cookies.
    pub token: String,
}

/// Public view of a user. The internal id and the password hash never appear here.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.public_id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn malformed_body(rejection: JsonRejection) -> HttpError {
    AuthError::Validation(format!("bad json: {}", rejection.body_text())).into()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing fields, malformed body or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload.map_err(malformed_body)?;

    let registered = state
        .auth
        .register(&req.username, &req.email, &req.password)
        .await?;

    let response = AuthResponse {
        id: registered.user.public_id,
        username: registered.user.username,
        email: registered.user.email,
        token: registered.token,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; sets the `auth` session cookie", body = AuthResponse),
        (status = 400, description = "Missing fields or malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload.map_err(malformed_body)?;

    let outcome = state.auth.login(&req.email, &req.password).await?;

    let cookie = session_cookie(
        &outcome.session.secret,
        outcome.session.expires_at,
        state.auth.session_ttl(),
        state.config.cookie_secure,
    );

    let response = AuthResponse {
        id: outcome.user.public_id,
        username: outcome.user.username,
        email: outcome.user.email,
        token: outcome.token,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// GET /api/auth/me - The authenticated caller's public profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The current user", body = UserResponse),
        (status = 401, description = "No valid session cookie or bearer token", body = ErrorResponse)
    )
)]
pub async fn me_handler(Extension(identity): Extension<Identity>) -> Json<UserResponse> {
    Json(identity.user.into())
}

/// POST /api/auth/logout - Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Cookie cleared"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let presented = presented_credentials(&headers);
    state
        .auth
        .logout(presented.session_secret.as_deref())
        .await?;

    let cookie = cleared_session_cookie(state.config.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}
