/// Tenancy context resolution
///
/// Every request operates against at most one *active organization*. The
/// active organization is resolved here, once, at the request boundary,
/// and then passed down explicitly as a [`TenantScope`], never held in
/// ambient global state. The scoped model operations in
/// [`crate::models`] take the scope as an argument, which keeps them
/// testable and rules out cross-request leakage under concurrency.
///
/// # Resolution rule
///
/// `users.current_organization_id` is a pointer, not a grant: it is only
/// honored if a membership row for (user, organization) still exists. A
/// stale pointer (e.g. the user was removed from the organization since
/// the last request) resolves to no active organization and self-heals by
/// clearing the column.
///
/// # Example
///
/// ```no_run
/// use orgdesk_shared::tenancy::{resolve_scope, switch_organization};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, org_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let scope = resolve_scope(&pool, user_id).await?;
/// // pass `scope` into every model read/write for this request
///
/// switch_organization(&pool, user_id, org_id).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::membership::{Membership, MembershipRole};
use crate::models::organization::Organization;

/// Explicit tenant context for a single request
///
/// `Unscoped` exists for trusted system operations (cleanup jobs, admin
/// tooling) and must never be constructed from caller-supplied request
/// data; nothing in the request path produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Reads and writes are confined to this organization
    Active(Uuid),

    /// Caller has no active organization: reads come back empty,
    /// writes are refused
    None,

    /// No tenant filter. Trusted system operations only.
    Unscoped,
}

impl TenantScope {
    /// Builds a scope from a resolved optional organization id
    pub fn from_resolved(org_id: Option<Uuid>) -> Self {
        match org_id {
            Some(id) => TenantScope::Active(id),
            None => TenantScope::None,
        }
    }

    /// The active organization id, if any
    pub fn org_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::Active(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this scope bypasses tenant filtering
    pub fn is_unscoped(&self) -> bool {
        matches!(self, TenantScope::Unscoped)
    }

    /// Requires an active organization for a write
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no organization is active. `Unscoped`
    /// is likewise rejected: system operations never create tenant-owned
    /// rows on a caller's behalf.
    pub fn require_org(&self) -> CoreResult<Uuid> {
        match self {
            TenantScope::Active(id) => Ok(*id),
            _ => Err(CoreError::InvalidInput(
                "No active organization selected".to_string(),
            )),
        }
    }
}

/// Resolves the active organization for a user
///
/// Verifies `current_organization_id` against the memberships table. A
/// pointer without a backing membership is cleared and the user resolves
/// to [`TenantScope::None`].
///
/// # Errors
///
/// `NotFound` if the user does not exist; otherwise database errors only.
pub async fn resolve_scope(pool: &PgPool, user_id: Uuid) -> CoreResult<TenantScope> {
    let current: Option<Option<Uuid>> =
        sqlx::query_scalar("SELECT current_organization_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    let Some(current) = current else {
        return Err(CoreError::NotFound);
    };

    let Some(org_id) = current else {
        return Ok(TenantScope::None);
    };

    if Membership::exists(pool, org_id, user_id).await? {
        return Ok(TenantScope::Active(org_id));
    }

    // Stale pointer: membership was revoked since the pointer was set.
    warn!(
        user_id = %user_id,
        organization_id = %org_id,
        "Clearing stale current_organization_id without backing membership"
    );
    sqlx::query(
        "UPDATE users SET current_organization_id = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(TenantScope::None)
}

/// Switches the user's active organization
///
/// # Errors
///
/// `Forbidden` unless the user holds a membership in `org_id`; the
/// current pointer is left untouched on failure.
pub async fn switch_organization(pool: &PgPool, user_id: Uuid, org_id: Uuid) -> CoreResult<()> {
    if !Membership::exists(pool, org_id, user_id).await? {
        return Err(CoreError::Forbidden(org_id));
    }

    sqlx::query(
        "UPDATE users SET current_organization_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(org_id)
    .execute(pool)
    .await?;

    debug!(user_id = %user_id, organization_id = %org_id, "Switched active organization");
    Ok(())
}

/// Creates an organization and installs the creator as its owner
///
/// Runs as a single transaction: organization insert, owner membership,
/// and the creator's context switch all succeed or all roll back.
///
/// # Errors
///
/// `InvalidInput` if the name is empty or already taken.
pub async fn create_organization(
    pool: &PgPool,
    creator_user_id: Uuid,
    name: &str,
) -> CoreResult<Organization> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidInput(
            "Organization name is required".to_string(),
        ));
    }
    let slug = Organization::slugify(name);

    let mut tx = pool.begin().await?;

    let organization = sqlx::query_as::<_, Organization>(
        r#"
        INSERT INTO organizations (name, slug)
        VALUES ($1, $2)
        RETURNING id, name, slug, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(&slug)
    .fetch_one(&mut *tx)
    .await
    .map_err(unique_name_to_invalid_input)?;

    sqlx::query("INSERT INTO memberships (organization_id, user_id, role) VALUES ($1, $2, $3)")
        .bind(organization.id)
        .bind(creator_user_id)
        .bind(MembershipRole::Owner)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE users SET current_organization_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(creator_user_id)
    .bind(organization.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    debug!(
        organization_id = %organization.id,
        creator = %creator_user_id,
        "Created organization with owner membership"
    );
    Ok(organization)
}

/// Deletes an organization, cascading to all tenant-owned rows
///
/// Memberships, projects, tasks, documents, comments, and invitations go
/// with it (FK cascade); users pointing at it as their active
/// organization are reset to no context (FK SET NULL).
///
/// # Errors
///
/// `NotFound` if the organization does not exist.
pub async fn delete_organization(pool: &PgPool, org_id: Uuid) -> CoreResult<()> {
    let deleted = Organization::delete(pool, org_id).await?;
    if !deleted {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

fn unique_name_to_invalid_input(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err
            .constraint()
            .map(|c| c.contains("name") || c.contains("slug"))
            .unwrap_or(false)
        {
            return CoreError::InvalidInput("Organization name is already taken".to_string());
        }
    }
    CoreError::Database(err)
}
