/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `organizations`: Organization CRUD and context switching
/// - `members`: Membership listing, invitations, role changes, removal
/// - `invitations`: Token resolution and acceptance
/// - `projects`, `tasks`, `documents`, `comments`: Tenant-scoped entities

pub mod auth;
pub mod comments;
pub mod documents;
pub mod health;
pub mod invitations;
pub mod members;
pub mod organizations;
pub mod projects;
pub mod tasks;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use orgdesk_shared::models::membership::{Membership, MembershipRole};
use sqlx::PgPool;
use uuid::Uuid;

/// Requires the user to hold at least `required` in the organization
///
/// A non-member gets 404, not 403, so the response does not confirm the
/// organization exists. An actual member with an insufficient role gets
/// 403; they already know the organization exists.
pub(crate) async fn require_role(
    db: &PgPool,
    org_id: Uuid,
    user_id: Uuid,
    required: MembershipRole,
) -> ApiResult<MembershipRole> {
    let role = Membership::get_role(db, org_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    if !role.at_least(required) {
        return Err(ApiError::Forbidden(
            "Insufficient permissions".to_string(),
        ));
    }

    Ok(role)
}

/// Flattens `validator` errors into the API's validation detail shape
pub(crate) fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}
