/// Membership model and database operations
///
/// A membership grants a user a role within one organization. The pair
/// (organization, user) is unique; roles form a strict hierarchy
/// owner > admin > member.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('member', 'admin', 'owner');
///
/// CREATE TABLE memberships (
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role membership_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (organization_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: full control, may delete the organization
/// - **admin**: manages members, invitations, and all tenant data
/// - **member**: works with projects, tasks, documents, comments
///
/// Membership mutation flows (invite-or-attach, verified role change,
/// removal) live in [`crate::members`]; this module is the data layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role a user holds within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Works with tenant data
    Member,

    /// Additionally manages members and invitations
    Admin,

    /// Additionally may rename and delete the organization
    Owner,
}

impl MembershipRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Member => "member",
            MembershipRole::Admin => "admin",
            MembershipRole::Owner => "owner",
        }
    }

    /// Parses a role from its string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(MembershipRole::Member),
            "admin" => Some(MembershipRole::Admin),
            "owner" => Some(MembershipRole::Owner),
            _ => None,
        }
    }

    /// Roles that can be handed out via invitation or role change
    ///
    /// Ownership is granted only at organization creation; it is not an
    /// assignable role.
    pub fn is_assignable(&self) -> bool {
        matches!(self, MembershipRole::Member | MembershipRole::Admin)
    }

    /// Whether this role meets or exceeds `required`
    ///
    /// Hierarchy: Owner > Admin > Member
    pub fn at_least(&self, required: MembershipRole) -> bool {
        self.level() >= required.level()
    }

    fn level(&self) -> u8 {
        match self {
            MembershipRole::Member => 1,
            MembershipRole::Admin => 2,
            MembershipRole::Owner => 3,
        }
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organization
    pub role: MembershipRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Member listing row: membership joined with user identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a membership (adds a user to an organization)
    ///
    /// # Errors
    ///
    /// Unique-constraint violation if the membership already exists;
    /// foreign-key violation if organization or user is missing.
    pub async fn create(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING organization_id, user_id, role, created_at
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Finds a specific membership
    pub async fn find(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT organization_id, user_id, role, created_at
            FROM memberships
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Checks whether a membership exists (any role)
    pub async fn exists(pool: &PgPool, org_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE organization_id = $1 AND user_id = $2)",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Gets a user's role in an organization
    pub async fn get_role(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipRole>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT role FROM memberships WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Upserts the role on an existing membership
    ///
    /// Returns the updated membership, or None if no membership row
    /// exists. Idempotent: setting the current role again succeeds.
    pub async fn update_role(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET role = $3
            WHERE organization_id = $1 AND user_id = $2
            RETURNING organization_id, user_id, role, created_at
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a membership (removes a user from an organization)
    pub async fn delete(pool: &PgPool, org_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM memberships WHERE organization_id = $1 AND user_id = $2")
                .bind(org_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all members of an organization with their identities
    pub async fn list_members(
        pool: &PgPool,
        org_id: Uuid,
    ) -> Result<Vec<MemberRow>, sqlx::Error> {
        sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.user_id, u.name, u.email, m.role, m.created_at AS joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(pool)
        .await
    }

    /// Counts members in an organization
    pub async fn count_by_organization(pool: &PgPool, org_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE organization_id = $1")
                .bind(org_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
