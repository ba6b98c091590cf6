/// Invitation workflow: issue, resolve, accept
///
/// Invitations bring users into an organization by email. The flow is:
/// an admin issues an invitation (a 60-character bearer token mailed to
/// the invitee, valid for 7 days), the invitee resolves the token to see
/// what it offers, and accepting it creates the membership and switches
/// the new member's active organization, all in one transaction.
///
/// The data layer lives in [`crate::models::invitation`].

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::mailer::Mailer;
use crate::models::invitation::Invitation;
use crate::models::membership::{Membership, MembershipRole};
use crate::models::organization::Organization;
use crate::models::user::User;

/// Length of the bearer token in an invitation link
pub const TOKEN_LENGTH: usize = 60;

/// How long an invitation stays redeemable
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Generates an unguessable alphanumeric invitation token
pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Builds the redemption link mailed to the invitee
pub fn redemption_link(app_url: &str, token: &str) -> String {
    format!("{}/invitations/{}", app_url.trim_end_matches('/'), token)
}

/// What a resolved invitation token means for the current visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    /// Valid and unclaimed; the visitor is not authenticated
    Pending,

    /// Valid, and the authenticated visitor's email matches
    LoggedInMatch,

    /// Valid, but the authenticated visitor's email differs
    LoggedInMismatch,

    /// Unknown token, expired, or already accepted
    Invalid,
}

/// Resolution of an invitation token, safe to show to the visitor
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub status: ResolveStatus,

    /// Present unless the status is `Invalid`
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<MembershipRole>,
}

impl Resolution {
    fn invalid() -> Self {
        Resolution {
            status: ResolveStatus::Invalid,
            organization_name: None,
            email: None,
            role: None,
        }
    }
}

/// Issues an invitation to join an organization
///
/// Refused when the address already belongs to a member
/// (`AlreadyMember`) or when a pending invitation for the pair already
/// exists (`DuplicateInvitation`). The duplicate check is backed by a
/// partial unique index, so concurrent issuers cannot both succeed. An
/// expired unaccepted row for the same pair still occupies that index;
/// it is superseded (deleted and replaced) in the same transaction.
/// Mail delivery failure is logged but does not revoke the invitation.
pub async fn issue(
    pool: &PgPool,
    mailer: &dyn Mailer,
    app_url: &str,
    org_id: Uuid,
    email: &str,
    role: MembershipRole,
) -> CoreResult<Invitation> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') || email.len() < 3 {
        return Err(CoreError::InvalidInput("A valid email address is required".to_string()));
    }
    if !role.is_assignable() {
        return Err(CoreError::InvalidRole(role.as_str().to_string()));
    }

    let organization = Organization::find_by_id(pool, org_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if let Some(user) = User::find_by_email(pool, &email).await? {
        if Membership::exists(pool, org_id, user.id).await? {
            return Err(CoreError::AlreadyMember);
        }
    }

    if Invitation::find_pending(pool, org_id, &email).await?.is_some() {
        return Err(CoreError::DuplicateInvitation);
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM invitations
        WHERE organization_id = $1 AND email = $2
          AND accepted_at IS NULL AND expires_at <= NOW()
        "#,
    )
    .bind(org_id)
    .bind(&email)
    .execute(&mut *tx)
    .await?;

    let invitation = Invitation::create(&mut *tx, org_id, &email, &token, role, expires_at)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::DuplicateInvitation
            }
            _ => CoreError::from(e),
        })?;

    tx.commit().await?;

    let link = redemption_link(app_url, &invitation.token);
    if let Err(e) = mailer
        .send_invitation(&email, &organization.name, &link, invitation.expires_at)
        .await
    {
        warn!(
            organization_id = %org_id,
            email = %email,
            error = %e,
            "invitation email delivery failed"
        );
    }

    info!(
        organization_id = %org_id,
        invitation_id = %invitation.id,
        role = role.as_str(),
        "invitation issued"
    );

    Ok(invitation)
}

/// Resolves an invitation token for display, without redeeming it
///
/// Never errors on a bad token; unknown, expired, and already-accepted
/// tokens all resolve to `Invalid` so the response leaks nothing about
/// which of the three it was.
pub async fn resolve(
    pool: &PgPool,
    token: &str,
    current_user: Option<&User>,
) -> CoreResult<Resolution> {
    let invitation = match Invitation::find_by_token(pool, token).await? {
        Some(inv) => inv,
        None => return Ok(Resolution::invalid()),
    };

    if invitation.is_accepted() || invitation.is_expired(Utc::now()) {
        return Ok(Resolution::invalid());
    }

    let organization = Organization::find_by_id(pool, invitation.organization_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    let status = match current_user {
        None => ResolveStatus::Pending,
        Some(user) if user.email == invitation.email => ResolveStatus::LoggedInMatch,
        Some(_) => ResolveStatus::LoggedInMismatch,
    };

    Ok(Resolution {
        status,
        organization_name: Some(organization.name),
        email: Some(invitation.email),
        role: Some(invitation.role),
    })
}

/// Redeems an invitation for the authenticated user
///
/// The user's email must match the invited address. On success, inside
/// one transaction: the invitation is marked accepted, a membership at
/// the invited role is created, and the user's active organization
/// switches to the new one. If the user somehow already holds a
/// membership, acceptance still succeeds and the existing role is kept.
///
/// # Errors
///
/// - `InvalidOrExpired` for unknown, expired, or already-accepted tokens
/// - `Forbidden` when the authenticated email does not match
pub async fn accept(pool: &PgPool, token: &str, user: &User) -> CoreResult<Membership> {
    let invitation = Invitation::find_by_token(pool, token)
        .await?
        .ok_or(CoreError::InvalidOrExpired)?;

    if invitation.is_accepted() || invitation.is_expired(Utc::now()) {
        return Err(CoreError::InvalidOrExpired);
    }
    if invitation.email != user.email {
        return Err(CoreError::Forbidden(invitation.organization_id));
    }

    let mut tx = pool.begin().await?;

    // The accepted_at guard makes concurrent redemptions race-safe: only
    // one transaction sees the row still pending.
    let claimed = sqlx::query(
        r#"
        UPDATE invitations
        SET accepted_at = NOW()
        WHERE id = $1 AND accepted_at IS NULL AND expires_at > NOW()
        "#,
    )
    .bind(invitation.id)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        return Err(CoreError::InvalidOrExpired);
    }

    let membership = sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO memberships (organization_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (organization_id, user_id) DO UPDATE SET role = memberships.role
        RETURNING organization_id, user_id, role, created_at
        "#,
    )
    .bind(invitation.organization_id)
    .bind(user.id)
    .bind(invitation.role)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE users SET current_organization_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(user.id)
    .bind(invitation.organization_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        organization_id = %invitation.organization_id,
        user_id = %user.id,
        role = membership.role.as_str(),
        "invitation accepted"
    );

    Ok(membership)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_redemption_link_shape() {
        assert_eq!(
            redemption_link("https://orgdesk.example", "abc123"),
            "https://orgdesk.example/invitations/abc123"
        );
        // A trailing slash on the base does not double up.
        assert_eq!(
            redemption_link("https://orgdesk.example/", "abc123"),
            "https://orgdesk.example/invitations/abc123"
        );
    }

    #[test]
    fn test_resolution_invalid_carries_no_details() {
        let r = Resolution::invalid();
        assert_eq!(r.status, ResolveStatus::Invalid);
        assert!(r.organization_name.is_none());
        assert!(r.email.is_none());
        assert!(r.role.is_none());
    }
}
