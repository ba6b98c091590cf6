/// Task model: work items nested under a project
///
/// Tasks carry the organization id redundantly with their project so
/// scoped queries never need a join, and so the project/task
/// organization agreement can be asserted outright. Creation verifies
/// the parent project through the caller's scope and checks that any
/// assignee is a member of the same organization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::membership::Membership;
use crate::models::project::Project;
use crate::tenancy::TenantScope;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "blocked" => Some(TaskStatus::Blocked),
            _ => None,
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning organization; always equal to the parent project's
    pub organization_id: Uuid,

    /// Parent project
    pub project_id: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,

    /// Urgency from 0 (none) to 10 (critical)
    pub priority: i16,

    pub due_date: Option<NaiveDate>,

    /// Assignee; must be a member of the owning organization
    pub assigned_to_user_id: Option<Uuid>,

    /// Creator (None if the account was deleted)
    pub created_by_user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i16>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to_user_id: Option<Uuid>,
}

/// Input for updating a task; only non-None fields change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i16>,
    pub due_date: Option<Option<NaiveDate>>,
    pub assigned_to_user_id: Option<Option<Uuid>>,
}

const TASK_COLUMNS: &str = "id, organization_id, project_id, title, description, status, \
                            priority, due_date, assigned_to_user_id, created_by_user_id, \
                            created_at, updated_at";

fn validate_priority(priority: i16) -> CoreResult<()> {
    if !(0..=10).contains(&priority) {
        return Err(CoreError::InvalidInput(
            "Priority must be between 0 and 10".to_string(),
        ));
    }
    Ok(())
}

async fn validate_assignee(
    pool: &PgPool,
    org_id: Uuid,
    assignee: Option<Uuid>,
) -> CoreResult<()> {
    if let Some(user_id) = assignee {
        if !Membership::exists(pool, org_id, user_id).await? {
            return Err(CoreError::InvalidInput(
                "Assignee must be a member of the organization".to_string(),
            ));
        }
    }
    Ok(())
}

impl Task {
    /// Creates a task under a project in the scope's active organization
    ///
    /// The parent project is resolved through the scope, so a project id
    /// from another tenant is `NotFound`. The stored `organization_id`
    /// is taken from the resolved project, never from the caller.
    pub async fn create(
        pool: &PgPool,
        scope: &TenantScope,
        project_id: Uuid,
        created_by: Uuid,
        data: CreateTask,
    ) -> CoreResult<Self> {
        let org_id = scope.require_org()?;
        let project = Project::fetch(pool, scope, project_id).await?;

        // The scoped fetch guarantees this; if it ever fails the scope
        // machinery itself is broken and the write must not proceed.
        if project.organization_id != org_id {
            error!(
                project_id = %project.id,
                project_org = %project.organization_id,
                scope_org = %org_id,
                "project resolved outside the active organization"
            );
            return Err(CoreError::InvariantViolation(
                "task project belongs to a different organization".to_string(),
            ));
        }

        if data.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("Task title is required".to_string()));
        }
        let priority = data.priority.unwrap_or(0);
        validate_priority(priority)?;
        validate_assignee(pool, org_id, data.assigned_to_user_id).await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (organization_id, project_id, title, description,
                               priority, due_date, assigned_to_user_id, created_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(project.organization_id)
        .bind(project.id)
        .bind(data.title.trim())
        .bind(data.description)
        .bind(priority)
        .bind(data.due_date)
        .bind(data.assigned_to_user_id)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks for a project visible in the scope, newest first
    ///
    /// The project itself must resolve through the scope first.
    pub async fn list_by_project(
        pool: &PgPool,
        scope: &TenantScope,
        project_id: Uuid,
    ) -> CoreResult<Vec<Self>> {
        let project = Project::fetch(pool, scope, project_id).await?;

        Ok(sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE project_id = $1 AND organization_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(project.id)
        .bind(project.organization_id)
        .fetch_all(pool)
        .await?)
    }

    /// Finds a task by id within the scope
    pub async fn find(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<Option<Self>> {
        match scope {
            TenantScope::Active(org_id) => Ok(sqlx::query_as::<_, Task>(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND organization_id = $2"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await?),
            TenantScope::None => Ok(None),
            TenantScope::Unscoped => Ok(sqlx::query_as::<_, Task>(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
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

    /// Updates a task resolved through the scoped read path
    ///
    /// Any status transition is allowed. A new assignee is re-checked
    /// against the membership table.
    pub async fn update(
        pool: &PgPool,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateTask,
    ) -> CoreResult<Self> {
        let mut task = Self::fetch(pool, scope, id).await?;

        if let Some(title) = data.title {
            if title.trim().is_empty() {
                return Err(CoreError::InvalidInput("Task title is required".to_string()));
            }
            task.title = title.trim().to_string();
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        if let Some(priority) = data.priority {
            validate_priority(priority)?;
            task.priority = priority;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee) = data.assigned_to_user_id {
            validate_assignee(pool, task.organization_id, assignee).await?;
            task.assigned_to_user_id = assignee;
        }

        let updated = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $3, description = $4, status = $5, priority = $6,
                due_date = $7, assigned_to_user_id = $8, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(task.organization_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.assigned_to_user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound)?;

        Ok(updated)
    }

    /// Deletes a task within the scope
    pub async fn delete(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<()> {
        let task = Self::fetch(pool, scope, id).await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(task.organization_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn test_priority_bounds() {
        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(10).is_ok());
        assert!(validate_priority(-1).is_err());
        assert!(validate_priority(11).is_err());
    }
}
