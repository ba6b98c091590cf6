/// Project endpoints
///
/// All handlers run against the caller's resolved tenant scope: listing
/// with no active organization returns an empty list, and writes
/// without one are rejected with 422.
///
/// # Endpoints
///
/// - `GET    /v1/projects` - List projects in the active organization
/// - `POST   /v1/projects` - Create
/// - `GET    /v1/projects/:project_id` - Show
/// - `PATCH  /v1/projects/:project_id` - Update fields
/// - `DELETE /v1/projects/:project_id` - Delete (tasks/documents cascade)

use crate::{
    app::{AppState, AuthContext},
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use orgdesk_shared::models::project::{CreateProject, Project, UpdateProject};
use tracing::warn;
use uuid::Uuid;

/// Lists projects visible in the caller's scope, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list(&state.db, &ctx.scope).await?;
    Ok(Json(projects))
}

/// Creates a project in the active organization
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = Project::create(&state.db, &ctx.scope, ctx.user.id, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Shows a project
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = Project::fetch(&state.db, &ctx.scope, project_id).await?;
    Ok(Json(project))
}

/// Updates a project's name, description, or status
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProject>,
) -> ApiResult<Json<Project>> {
    let project = Project::update(&state.db, &ctx.scope, project_id, req).await?;
    Ok(Json(project))
}

/// Deletes a project; its tasks, documents, and comments go with it
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    // Resolve before deleting so the blob prefix is known.
    let project = Project::fetch(&state.db, &ctx.scope, project_id).await?;

    Project::delete(&state.db, &ctx.scope, project_id).await?;

    let prefix = format!("documents/{}/{}/", project.organization_id, project.id);
    if let Err(e) = state.storage.delete_prefix(&prefix).await {
        warn!(project_id = %project.id, error = %e, "blob cleanup after project delete failed");
    }

    Ok(StatusCode::NO_CONTENT)
}
