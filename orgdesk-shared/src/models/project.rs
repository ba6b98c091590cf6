/// Project model: tenant-owned, scoped at every access
///
/// All reads take a [`TenantScope`] and are filtered to the active
/// organization; a scope without an active organization reads empty.
/// Creates stamp `organization_id` from the scope. Updates and deletes
/// key on (id, organization) so a row in another tenant is
/// indistinguishable from a missing one (`NotFound` either way).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::tenancy::TenantScope;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    OnHold,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            "on_hold" => Some(ProjectStatus::OnHold),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    /// Owning organization; stamped server-side, never caller-supplied
    pub organization_id: Uuid,

    /// Creator (None if the account was deleted)
    pub creator_user_id: Option<Uuid>,

    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a project; only non-None fields change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
}

const PROJECT_COLUMNS: &str =
    "id, organization_id, creator_user_id, name, description, status, created_at, updated_at";

impl Project {
    /// Creates a project in the scope's active organization
    ///
    /// The organization id comes from the resolved scope; any value in
    /// the caller's payload is ignored by construction.
    pub async fn create(
        pool: &PgPool,
        scope: &TenantScope,
        creator_user_id: Uuid,
        data: CreateProject,
    ) -> CoreResult<Self> {
        let org_id = scope.require_org()?;

        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Project name is required".to_string()));
        }

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (organization_id, creator_user_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(org_id)
        .bind(creator_user_id)
        .bind(data.name.trim())
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Lists projects visible in the scope, newest first
    pub async fn list(pool: &PgPool, scope: &TenantScope) -> CoreResult<Vec<Self>> {
        match scope {
            TenantScope::Active(org_id) => Ok(sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE organization_id = $1 ORDER BY created_at DESC"
            ))
            .bind(org_id)
            .fetch_all(pool)
            .await?),
            TenantScope::None => Ok(Vec::new()),
            TenantScope::Unscoped => Ok(sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await?),
        }
    }

    /// Finds a project by id within the scope
    pub async fn find(
        pool: &PgPool,
        scope: &TenantScope,
        id: Uuid,
    ) -> CoreResult<Option<Self>> {
        match scope {
            TenantScope::Active(org_id) => Ok(sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND organization_id = $2"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await?),
            TenantScope::None => Ok(None),
            TenantScope::Unscoped => Ok(sqlx::query_as::<_, Project>(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(pool)
            .await?),
        }
    }

    /// Like [`Self::find`] but a miss is `NotFound`
    pub async fn fetch(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<Self> {
        Self::find(pool, scope, id).await?.ok_or(CoreError::NotFound)
    }

    /// Updates a project resolved through the scoped read path
    pub async fn update(
        pool: &PgPool,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProject,
    ) -> CoreResult<Self> {
        // Load through the scope first so cross-tenant targets 404.
        let mut project = Self::fetch(pool, scope, id).await?;

        if let Some(name) = data.name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidInput("Project name is required".to_string()));
            }
            project.name = name.trim().to_string();
        }
        if let Some(description) = data.description {
            project.description = description;
        }
        if let Some(status) = data.status {
            project.status = status;
        }

        let updated = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET name = $3, description = $4, status = $5, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(project.organization_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound)?;

        Ok(updated)
    }

    /// Deletes a project within the scope; tasks and documents cascade
    pub async fn delete(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<()> {
        let project = Self::fetch(pool, scope, id).await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(project.organization_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }
}
