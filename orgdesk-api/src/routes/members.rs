/// Member and invitation management endpoints
///
/// All of these operate on the organization named in the path, not on
/// the caller's active organization, so an admin can manage a tenant
/// they are not currently switched into.
///
/// # Endpoints
///
/// - `GET    /v1/organizations/:org_id/members` - List (member)
/// - `PATCH  /v1/organizations/:org_id/members/:user_id` - Change role (admin)
/// - `DELETE /v1/organizations/:org_id/members/:user_id` - Remove (admin)
/// - `GET    /v1/organizations/:org_id/invitations` - List (admin)
/// - `POST   /v1/organizations/:org_id/invitations` - Invite (admin)

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
    routes::{require_role, validation_error},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use orgdesk_shared::{
    members::AttachOutcome,
    models::{
        invitation::Invitation,
        membership::{MemberRow, Membership, MembershipRole},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    /// Email address to invite
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role granted on acceptance (default: member)
    pub role: Option<String>,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// New role; only "member" and "admin" are assignable
    pub role: String,
}

fn parse_role(role: &str) -> ApiResult<MembershipRole> {
    MembershipRole::parse(role)
        .ok_or_else(|| ApiError::Unprocessable(format!("Invalid role: {}", role)))
}

/// Lists members of an organization
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberRow>>> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Member).await?;

    let members = Membership::list_members(&state.db, org_id).await?;
    Ok(Json(members))
}

/// Changes a member's role (admin)
pub async fn change_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<Membership>> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Admin).await?;

    let role = parse_role(&req.role)?;
    let membership =
        orgdesk_shared::members::change_role(&state.db, org_id, user_id, role).await?;
    Ok(Json(membership))
}

/// Removes a member from an organization (admin)
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Admin).await?;

    orgdesk_shared::members::remove_member(&state.db, org_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists an organization's invitations, newest first (admin)
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Invitation>>> {
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Admin).await?;

    let invitations = Invitation::list_by_organization(&state.db, org_id).await?;
    Ok(Json(invitations))
}

/// Brings an email address into an organization (admin)
///
/// An address with an existing account becomes a member immediately;
/// otherwise an invitation email goes out. The response's `outcome`
/// field says which happened.
///
/// # Errors
///
/// - `409 Conflict`: Already a member, or a pending invitation exists
/// - `422 Unprocessable Entity`: Bad email or non-assignable role
pub async fn invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<AttachOutcome>)> {
    req.validate().map_err(validation_error)?;
    require_role(&state.db, org_id, ctx.user.id, MembershipRole::Admin).await?;

    let role = match req.role.as_deref() {
        Some(role) => parse_role(role)?,
        None => MembershipRole::Member,
    };

    let outcome = orgdesk_shared::members::invite_or_attach(
        &state.db,
        state.mailer.as_ref(),
        &state.config.api.app_url,
        org_id,
        &req.email,
        role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
