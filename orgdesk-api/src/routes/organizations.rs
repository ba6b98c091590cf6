/// Organization endpoints
///
/// # Endpoints
///
/// - `GET    /v1/organizations` - Organizations the caller belongs to
/// - `POST   /v1/organizations` - Create (caller becomes owner)
/// - `GET    /v1/organizations/:org_id` - Show (member)
/// - `PATCH  /v1/organizations/:org_id` - Rename (admin)
/// - `DELETE /v1/organizations/:org_id` - Delete with cascade (owner)
/// - `POST   /v1/organizations/:org_id/switch` - Set active organization

use crate::{
    app::{AppState, AuthContext},
    error::ApiResult,
    routes::{require_role, validation_error},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use orgdesk_shared::{
    models::{
        membership::MembershipRole,
        organization::{Organization, OrganizationWithRole},
    },
    tenancy,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

/// Create / rename request
#[derive(Debug, Deserialize, Validate)]
pub struct OrganizationNameRequest {
    /// Display name, unique across the system
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Lists the caller's organizations with their role in each
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<OrganizationWithRole>>> {
    let organizations = Organization::list_for_user(&state.db, ctx.user.id).await?;
    Ok(Json(organizations))
}

/// Creates an organization; the caller becomes owner and switches to it
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<OrganizationNameRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    req.validate().map_err(validation_error)?;

    let organization = tenancy::create_organization(&state.db, ctx.user.id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// Shows an organization the caller is a member of
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Member).await?;

    let organization = Organization::find_by_id(&state.db, org_id)
        .await?
        .ok_or(orgdesk_shared::CoreError::NotFound)?;
    Ok(Json(organization))
}

/// Renames an organization (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<OrganizationNameRequest>,
) -> ApiResult<Json<Organization>> {
    req.validate().map_err(validation_error)?;
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Admin).await?;

    let organization = Organization::rename(&state.db, org_id, req.name.trim())
        .await?
        .ok_or(orgdesk_shared::CoreError::NotFound)?;
    Ok(Json(organization))
}

/// Deletes an organization and everything it owns (owner only)
///
/// Rows cascade in the database; blobs are cleared from the store after
/// the commit. A blob cleanup failure is logged, not surfaced, since
/// the tenant data is already gone.
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Owner).await?;

    tenancy::delete_organization(&state.db, org_id).await?;

    if let Err(e) = state
        .storage
        .delete_prefix(&format!("documents/{org_id}/"))
        .await
    {
        warn!(organization_id = %org_id, error = %e, "blob cleanup after organization delete failed");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Switches the caller's active organization
pub async fn switch(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tenancy::switch_organization(&state.db, ctx.user.id, org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
