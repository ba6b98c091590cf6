/// Comment endpoints
///
/// Comments target a (kind, id) pair naming a project, task, or
/// document. The target is always resolved through the caller's scope,
/// so commenting on or listing another tenant's entity is a 404.
///
/// # Endpoints
///
/// - `GET    /v1/comments?kind=task&id=<uuid>` - List for a target
/// - `POST   /v1/comments` - Create
/// - `DELETE /v1/comments/:comment_id` - Delete (author, or admin)

use crate::{
    app::{AppState, AuthContext},
    error::ApiResult,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use orgdesk_shared::models::{
    comment::{Comment, CommentWithAuthor, CommentableKind},
    membership::{Membership, MembershipRole},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Target selector, used both as query params and in the create body
#[derive(Debug, Deserialize)]
pub struct CommentTarget {
    /// Target kind: project, task, or document
    pub kind: CommentableKind,

    /// Target entity id
    pub id: Uuid,
}

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// Target kind: project, task, or document
    pub kind: CommentableKind,

    /// Target entity id
    pub id: Uuid,

    /// Comment text
    #[validate(length(min = 1, max = 10000, message = "Body must be 1-10000 characters"))]
    pub body: String,
}

/// Lists comments on a target, oldest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(target): Query<CommentTarget>,
) -> ApiResult<Json<Vec<CommentWithAuthor>>> {
    let comments =
        Comment::list_for_target(&state.db, &ctx.scope, target.kind, target.id).await?;
    Ok(Json(comments))
}

/// Creates a comment on a target in the active organization
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate().map_err(crate::routes::validation_error)?;

    let comment = Comment::create(
        &state.db,
        &ctx.scope,
        req.kind,
        req.id,
        ctx.user.id,
        &req.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Deletes a comment
///
/// Authors may delete their own comments; admins and owners may delete
/// any comment in the organization.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let is_admin = match ctx.scope.org_id() {
        Some(org_id) => Membership::get_role(&state.db, org_id, ctx.user.id)
            .await?
            .map(|role| role.at_least(MembershipRole::Admin))
            .unwrap_or(false),
        None => false,
    };

    Comment::delete(&state.db, &ctx.scope, comment_id, ctx.user.id, is_admin).await?;
    Ok(StatusCode::NO_CONTENT)
}
