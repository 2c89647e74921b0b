//! services/api/src/web/projects.rs
//!
//! Owner-scoped project endpoints. Every route here sits behind `require_auth`.

use crate::auth::bounded;
use crate::web::error::{ErrorResponse, HttpError};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use plume_core::{Identity, Project};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.public_id,
            title: project.title,
            description: project.description,
            created_at: project.created_at,
        }
    }
}

/// POST /api/projects - Create a project owned by the caller
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Missing title", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload
        .map_err(|rejection| HttpError::BadRequest(format!("bad json: {}", rejection.body_text())))?;
    let title = req.title.trim();
    if title.is_empty() {
        return Err(HttpError::BadRequest("title required".to_string()));
    }

    let project = bounded(
        state.config.store_timeout,
        state
            .projects
            .create_project(identity.user.id, title, &req.description),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// GET /api/projects - List the caller's projects
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "The caller's projects", body = [ProjectResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<ProjectResponse>>, HttpError> {
    let projects = bounded(
        state.config.store_timeout,
        state.projects.list_projects(identity.user.id),
    )
    .await?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// GET /api/projects/{id} - Fetch one of the caller's projects
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(
        ("id" = Uuid, Path, description = "The project's public identifier")
    ),
    responses(
        (status = 200, description = "The project", body = ProjectResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "No such project for this caller", body = ErrorResponse)
    )
)]
pub async fn get_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, HttpError> {
    let project = bounded(
        state.config.store_timeout,
        state.projects.get_project(identity.user.id, id),
    )
    .await?;
    Ok(Json(project.into()))
}
