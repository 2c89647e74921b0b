//! services/api/src/web/error.rs
//!
//! The only place where error kinds become HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plume_core::{AuthError, PortError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum HttpError {
    Auth(AuthError),
    /// Invalid input to a non-auth handler.
    BadRequest(String),
    NotFound(String),
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        HttpError::Auth(err)
    }
}

impl From<PortError> for HttpError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => HttpError::NotFound(what),
            other => HttpError::Auth(AuthError::from(other)),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            HttpError::Auth(err) => match err {
                AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                AuthError::DuplicateEmail => (StatusCode::BAD_REQUEST, err.to_string()),
                AuthError::AuthenticationFailure => (StatusCode::UNAUTHORIZED, err.to_string()),
                AuthError::Store(_) | AuthError::Hash(_) => {
                    error!("Request failed: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
