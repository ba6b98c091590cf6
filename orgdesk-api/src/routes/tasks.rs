/// Task endpoints
///
/// Tasks nest under a project for listing and creation; individual
/// tasks are addressed directly. Everything is resolved through the
/// caller's tenant scope.
///
/// # Endpoints
///
/// - `GET    /v1/projects/:project_id/tasks` - List tasks in a project
/// - `POST   /v1/projects/:project_id/tasks` - Create
/// - `GET    /v1/tasks/:task_id` - Show
/// - `PATCH  /v1/tasks/:task_id` - Update fields
/// - `DELETE /v1/tasks/:task_id` - Delete

use crate::{
    app::{AppState, AuthContext},
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use orgdesk_shared::models::task::{CreateTask, Task, UpdateTask};
use uuid::Uuid;

/// Lists tasks for a project, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_project(&state.db, &ctx.scope, project_id).await?;
    Ok(Json(tasks))
}

/// Creates a task under a project
///
/// # Errors
///
/// - `404 Not Found`: Project missing or in another organization
/// - `422 Unprocessable Entity`: Bad priority or non-member assignee
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = Task::create(&state.db, &ctx.scope, project_id, ctx.user.id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Shows a task
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::fetch(&state.db, &ctx.scope, task_id).await?;
    Ok(Json(task))
}

/// Updates a task's fields; any status transition is allowed
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    let task = Task::update(&state.db, &ctx.scope, task_id, req).await?;
    Ok(Json(task))
}

/// Deletes a task
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    Task::delete(&state.db, &ctx.scope, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
