//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the health check.

use crate::web::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::web::error::ErrorResponse;
use crate::web::projects::{CreateProjectRequest, ProjectResponse};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::me_handler,
        crate::web::auth::logout_handler,
        crate::web::projects::create_project_handler,
        crate::web::projects::list_projects_handler,
        crate::web::projects::get_project_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            ErrorResponse,
            CreateProjectRequest,
            ProjectResponse
        )
    ),
    tags(
        (name = "Plume API", description = "Accounts, sessions and writing projects.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health Check
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub async fn health_handler() -> &'static str {
    "ok"
}
