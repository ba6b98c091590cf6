/// Comment model: discussion attached to a project, task, or document
///
/// Comments target one of three entity kinds via (kind, id) rather than
/// a foreign key, so the target is verified through the caller's scope
/// at creation time. A target in another tenant is `NotFound`, the same
/// answer as a target that never existed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::document::Document;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::tenancy::TenantScope;

/// Kind of entity a comment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "commentable_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommentableKind {
    Project,
    Task,
    Document,
}

impl CommentableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentableKind::Project => "project",
            CommentableKind::Task => "task",
            CommentableKind::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "project" => Some(CommentableKind::Project),
            "task" => Some(CommentableKind::Task),
            "document" => Some(CommentableKind::Document),
            _ => None,
        }
    }
}

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    /// Owning organization, copied from the target at creation
    pub organization_id: Uuid,

    pub commentable_kind: CommentableKind,
    pub commentable_id: Uuid,

    /// Author (None if the account was deleted)
    pub user_id: Option<Uuid>,

    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment joined with its author's name, for listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub commentable_kind: CommentableKind,
    pub commentable_id: Uuid,
    pub user_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

const COMMENT_COLUMNS: &str = "id, organization_id, commentable_kind, commentable_id, \
                               user_id, body, created_at, updated_at";

/// Resolves a comment target through the scope, returning the
/// organization that owns it
async fn resolve_target_org(
    pool: &PgPool,
    scope: &TenantScope,
    kind: CommentableKind,
    id: Uuid,
) -> CoreResult<Uuid> {
    let org_id = match kind {
        CommentableKind::Project => Project::fetch(pool, scope, id).await?.organization_id,
        CommentableKind::Task => Task::fetch(pool, scope, id).await?.organization_id,
        CommentableKind::Document => Document::fetch(pool, scope, id).await?.organization_id,
    };
    Ok(org_id)
}

impl Comment {
    /// Creates a comment on a target resolved through the scope
    pub async fn create(
        pool: &PgPool,
        scope: &TenantScope,
        kind: CommentableKind,
        target_id: Uuid,
        author_user_id: Uuid,
        body: &str,
    ) -> CoreResult<Self> {
        scope.require_org()?;

        if body.trim().is_empty() {
            return Err(CoreError::InvalidInput("Comment body is required".to_string()));
        }

        let org_id = resolve_target_org(pool, scope, kind, target_id).await?;

        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (organization_id, commentable_kind, commentable_id, user_id, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(org_id)
        .bind(kind)
        .bind(target_id)
        .bind(author_user_id)
        .bind(body.trim())
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Lists comments on a target, oldest first
    ///
    /// The target must resolve through the scope; a cross-tenant or
    /// missing target is `NotFound` rather than an empty list.
    pub async fn list_for_target(
        pool: &PgPool,
        scope: &TenantScope,
        kind: CommentableKind,
        target_id: Uuid,
    ) -> CoreResult<Vec<CommentWithAuthor>> {
        let org_id = resolve_target_org(pool, scope, kind, target_id).await?;

        Ok(sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.commentable_kind, c.commentable_id, c.user_id,
                   u.name AS author_name, c.body, c.created_at
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.organization_id = $1
              AND c.commentable_kind = $2
              AND c.commentable_id = $3
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(org_id)
        .bind(kind)
        .bind(target_id)
        .fetch_all(pool)
        .await?)
    }

    /// Finds a comment by id within the scope
    pub async fn find(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<Option<Self>> {
        match scope {
            TenantScope::Active(org_id) => Ok(sqlx::query_as::<_, Comment>(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND organization_id = $2"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await?),
            TenantScope::None => Ok(None),
            TenantScope::Unscoped => Ok(sqlx::query_as::<_, Comment>(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(pool)
            .await?),
        }
    }

    /// Deletes a comment within the scope
    ///
    /// Only the author may delete their comment; admins and owners may
    /// delete any comment in the organization.
    pub async fn delete(
        pool: &PgPool,
        scope: &TenantScope,
        id: Uuid,
        requester_user_id: Uuid,
        requester_is_admin: bool,
    ) -> CoreResult<()> {
        let comment = Self::find(pool, scope, id).await?.ok_or(CoreError::NotFound)?;

        if !requester_is_admin && comment.user_id != Some(requester_user_id) {
            return Err(CoreError::Forbidden(comment.organization_id));
        }

        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(comment.organization_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }
}
