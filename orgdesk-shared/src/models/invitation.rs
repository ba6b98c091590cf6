/// Invitation model and database operations
///
/// An invitation is a pending membership offer carried by an unguessable
/// bearer token. Its lifecycle is `pending → accepted` (stored, terminal)
/// or `pending → expired` (implicit: the clock passes `expires_at`;
/// nothing is written and the row is never deleted automatically).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     email VARCHAR(255) NOT NULL,
///     token VARCHAR(255) NOT NULL UNIQUE,
///     role membership_role NOT NULL DEFAULT 'member',
///     expires_at TIMESTAMPTZ NOT NULL,
///     accepted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// -- one pending invitation per (organization, email); this partial
/// -- unique index, not the application check, is what makes duplicate
/// -- creation race-safe
/// CREATE UNIQUE INDEX idx_invitations_pending_unique
///     ON invitations (organization_id, email)
///     WHERE accepted_at IS NULL;
/// ```
///
/// The issue/resolve/accept workflow lives in [`crate::invitations`];
/// this module is the data layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::MembershipRole;

/// Invitation row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    /// Unique invitation ID
    pub id: Uuid,

    /// Organization the invitation grants membership in
    pub organization_id: Uuid,

    /// Invited email address (lowercase)
    pub email: String,

    /// Unguessable bearer token embedded in the redemption link
    #[serde(skip_serializing)]
    pub token: String,

    /// Role granted on acceptance
    pub role: MembershipRole,

    /// Past this instant the invitation can no longer be redeemed
    pub expires_at: DateTime<Utc>,

    /// When the invitation was redeemed (None while pending)
    pub accepted_at: Option<DateTime<Utc>>,

    /// When the invitation was issued
    pub created_at: DateTime<Utc>,
}

const INVITATION_COLUMNS: &str =
    "id, organization_id, email, token, role, expires_at, accepted_at, created_at";

impl Invitation {
    /// Whether the invitation has passed its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the invitation has been redeemed
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// Inserts a new pending invitation
    ///
    /// # Errors
    ///
    /// Unique-constraint violation if a pending invitation for
    /// (organization, email) already exists, or on token collision.
    pub async fn create<'e, E>(
        executor: E,
        org_id: Uuid,
        email: &str,
        token: &str,
        role: MembershipRole,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            INSERT INTO invitations (organization_id, email, token, role, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(org_id)
        .bind(email.trim().to_lowercase())
        .bind(token)
        .bind(role)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Looks an invitation up by its bearer token
    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Finds the pending (unaccepted, unexpired) invitation for an email
    /// in an organization, if one exists
    pub async fn find_pending(
        pool: &PgPool,
        org_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE organization_id = $1
              AND email = $2
              AND accepted_at IS NULL
              AND expires_at > NOW()
            "#
        ))
        .bind(org_id)
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
    }

    /// Lists all invitations for an organization, newest first
    pub async fn list_by_organization(
        pool: &PgPool,
        org_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE organization_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes pending invitations whose expiry is older than `before`
    ///
    /// Housekeeping for trusted system callers; accepted invitations are
    /// kept as an audit trail.
    pub async fn purge_expired_before(
        pool: &PgPool,
        before: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM invitations WHERE accepted_at IS NULL AND expires_at < $1",
        )
        .bind(before)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(expires_at: DateTime<Utc>, accepted_at: Option<DateTime<Utc>>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "invitee@example.com".to_string(),
            token: "t".repeat(60),
            role: MembershipRole::Member,
            expires_at,
            accepted_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired_boundary() {
        let now = Utc::now();
        assert!(sample(now, None).is_expired(now));
        assert!(sample(now - Duration::seconds(1), None).is_expired(now));
        assert!(!sample(now + Duration::seconds(1), None).is_expired(now));
    }

    #[test]
    fn test_is_accepted() {
        let now = Utc::now();
        assert!(!sample(now + Duration::days(7), None).is_accepted());
        assert!(sample(now + Duration::days(7), Some(now)).is_accepted());
    }
}
