/// Membership management: invite-or-attach, role changes, removal
///
/// The data layer lives in [`crate::models::membership`]; this module
/// adds the rules. Only member and admin are assignable roles, the
/// owner's membership is immutable through this interface, and removing
/// a member also clears their active-organization pointer when it names
/// the organization they are leaving.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::invitations;
use crate::mailer::Mailer;
use crate::models::invitation::Invitation;
use crate::models::membership::{Membership, MembershipRole};
use crate::models::organization::Organization;
use crate::models::user::User;

/// Result of [`invite_or_attach`]
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttachOutcome {
    /// The address belongs to an existing account; it was made a member
    /// directly, no invitation round-trip
    Attached { membership: Membership },

    /// No account exists for the address; an invitation email was sent
    Invited { invitation: Invitation },
}

/// Brings an email address into an organization
///
/// If an account with the address already exists it is attached
/// directly at the given role; the new member's active organization is
/// left alone, they switch in themselves. If no account exists, the
/// invitation workflow takes over and mails a redemption link built
/// from `app_url`.
///
/// # Errors
///
/// - `InvalidRole` if `role` is not assignable
/// - `AlreadyMember` if the address already belongs to a member
/// - `NotFound` if the organization does not exist
/// - `DuplicateInvitation` / `InvalidInput` from the invitation path
pub async fn invite_or_attach(
    pool: &PgPool,
    mailer: &dyn Mailer,
    app_url: &str,
    org_id: Uuid,
    email: &str,
    role: MembershipRole,
) -> CoreResult<AttachOutcome> {
    if !role.is_assignable() {
        return Err(CoreError::InvalidRole(role.as_str().to_string()));
    }
    if Organization::find_by_id(pool, org_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }

    let email = email.trim().to_lowercase();

    if let Some(user) = User::find_by_email(pool, &email).await? {
        if Membership::exists(pool, org_id, user.id).await? {
            return Err(CoreError::AlreadyMember);
        }

        let membership = Membership::create(pool, org_id, user.id, role)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    CoreError::AlreadyMember
                }
                _ => CoreError::from(e),
            })?;

        info!(
            organization_id = %org_id,
            user_id = %user.id,
            role = role.as_str(),
            "existing user attached as member"
        );
        return Ok(AttachOutcome::Attached { membership });
    }

    let invitation = invitations::issue(pool, mailer, app_url, org_id, &email, role).await?;
    Ok(AttachOutcome::Invited { invitation })
}

/// Changes a member's role within an organization
///
/// Only assignable roles (member, admin) are accepted; the owner role is
/// granted at organization creation and never reassigned. The write is
/// read back and verified before reporting success.
///
/// # Errors
///
/// - `InvalidRole` if `new_role` is not assignable
/// - `NotMember` if the user has no membership in the organization
/// - `InvalidInput` if the target is the organization owner
/// - `RoleUpdateFailed` if the verification read disagrees with the write
pub async fn change_role(
    pool: &PgPool,
    org_id: Uuid,
    target_user_id: Uuid,
    new_role: MembershipRole,
) -> CoreResult<Membership> {
    if !new_role.is_assignable() {
        return Err(CoreError::InvalidRole(new_role.as_str().to_string()));
    }

    let current = Membership::find(pool, org_id, target_user_id)
        .await?
        .ok_or(CoreError::NotMember)?;

    if current.role == MembershipRole::Owner {
        return Err(CoreError::InvalidInput(
            "The organization owner's role cannot be changed".to_string(),
        ));
    }

    let updated = Membership::update_role(pool, org_id, target_user_id, new_role)
        .await?
        .ok_or(CoreError::NotMember)?;

    // Read back and verify rather than trusting the returned row.
    let verified = Membership::get_role(pool, org_id, target_user_id).await?;
    if verified != Some(new_role) {
        error!(
            organization_id = %org_id,
            user_id = %target_user_id,
            expected = new_role.as_str(),
            found = ?verified.map(|r| r.as_str()),
            "role mismatch after update"
        );
        return Err(CoreError::RoleUpdateFailed);
    }

    info!(
        organization_id = %org_id,
        user_id = %target_user_id,
        role = new_role.as_str(),
        "member role changed"
    );

    Ok(updated)
}

/// Removes a member from an organization
///
/// If the member's active-organization pointer names the organization
/// they are being removed from, it is cleared in the same transaction;
/// a pointer at some other organization is left alone. Removing the
/// owner is refused.
///
/// # Errors
///
/// - `NotMember` if the user has no membership in the organization
/// - `InvalidInput` if the target is the organization owner
pub async fn remove_member(pool: &PgPool, org_id: Uuid, target_user_id: Uuid) -> CoreResult<()> {
    let membership = Membership::find(pool, org_id, target_user_id)
        .await?
        .ok_or(CoreError::NotMember)?;

    if membership.role == MembershipRole::Owner {
        return Err(CoreError::InvalidInput(
            "The organization owner cannot be removed".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let deleted =
        sqlx::query("DELETE FROM memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(org_id)
            .bind(target_user_id)
            .execute(&mut *tx)
            .await?;

    if deleted.rows_affected() == 0 {
        return Err(CoreError::NotMember);
    }

    sqlx::query(
        r#"
        UPDATE users
        SET current_organization_id = NULL, updated_at = NOW()
        WHERE id = $1 AND current_organization_id = $2
        "#,
    )
    .bind(target_user_id)
    .bind(org_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        organization_id = %org_id,
        user_id = %target_user_id,
        "member removed"
    );

    Ok(())
}
