/// Invitation resolution and acceptance endpoints
///
/// # Endpoints
///
/// - `GET  /v1/invitations/:token` - Resolve a token for display
/// - `POST /v1/invitations/:token/accept` - Redeem (authenticated)
///
/// Resolution is a public route because invitation links are opened
/// from email clients by visitors who may not be logged in. If an
/// Authorization header is present it is honored, so the response can
/// say whether the logged-in account matches the invited address.

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use orgdesk_shared::{
    auth::jwt,
    invitations,
    models::{membership::Membership, user::User},
};

/// Resolves an invitation token for display
///
/// Unknown, expired, and already-accepted tokens all come back with
/// `"status": "invalid"` and no organization details; the response never
/// distinguishes which case it was.
pub async fn resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> ApiResult<Json<invitations::Resolution>> {
    let current_user = optional_user(&state, &headers).await?;

    let resolution = invitations::resolve(&state.db, &token, current_user.as_ref()).await?;
    Ok(Json(resolution))
}

/// Redeems an invitation for the authenticated caller
///
/// # Errors
///
/// - `410 Gone`: Unknown, expired, or already-accepted token
/// - `403 Forbidden`: Logged-in email does not match the invited address
pub async fn accept(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<Membership>> {
    let membership = invitations::accept(&state.db, &token, &ctx.user).await?;
    Ok(Json(membership))
}

/// Loads the user behind an Authorization header, if one was sent
///
/// A missing header means an anonymous visitor; a header that fails
/// validation is still a 401, not silently anonymous.
async fn optional_user(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<User>> {
    let Some(auth_header) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Some(user))
}
