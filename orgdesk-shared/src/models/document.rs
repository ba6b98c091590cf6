/// Document model: file metadata nested under a project
///
/// This is the metadata half of document storage. The bytes live behind
/// a [`crate::storage::BlobStore`] at `storage_path`; the row records
/// name, content type, and size. Creation resolves the parent project
/// through the caller's scope, the same as tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::project::Project;
use crate::tenancy::TenantScope;

/// Document row (metadata only; bytes live in the blob store)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,

    /// Owning organization; always equal to the parent project's
    pub organization_id: Uuid,

    /// Parent project
    pub project_id: Uuid,

    /// Display name, defaults to the uploaded file name
    pub name: String,

    /// Blob store key for the stored bytes
    #[serde(skip_serializing)]
    pub storage_path: String,

    pub mime_type: String,
    pub size_bytes: i64,

    /// Uploader (None if the account was deleted)
    pub uploaded_by_user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording an uploaded document
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

const DOCUMENT_COLUMNS: &str = "id, organization_id, project_id, name, storage_path, \
                                mime_type, size_bytes, uploaded_by_user_id, created_at, \
                                updated_at";

impl Document {
    /// Records a document under a project in the scope's active organization
    ///
    /// Expects the bytes to already be in the blob store at
    /// `data.storage_path`; the upload flow in the API layer does the
    /// write first and deletes the blob again if this insert fails.
    pub async fn create(
        pool: &PgPool,
        scope: &TenantScope,
        project_id: Uuid,
        uploaded_by: Uuid,
        data: CreateDocument,
    ) -> CoreResult<Self> {
        scope.require_org()?;
        let project = Project::fetch(pool, scope, project_id).await?;

        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Document name is required".to_string(),
            ));
        }

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (organization_id, project_id, name, storage_path,
                                   mime_type, size_bytes, uploaded_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(project.organization_id)
        .bind(project.id)
        .bind(data.name.trim())
        .bind(&data.storage_path)
        .bind(&data.mime_type)
        .bind(data.size_bytes)
        .bind(uploaded_by)
        .fetch_one(pool)
        .await?;

        Ok(document)
    }

    /// Lists documents for a project visible in the scope, newest first
    pub async fn list_by_project(
        pool: &PgPool,
        scope: &TenantScope,
        project_id: Uuid,
    ) -> CoreResult<Vec<Self>> {
        let project = Project::fetch(pool, scope, project_id).await?;

        Ok(sqlx::query_as::<_, Document>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS} FROM documents
            WHERE project_id = $1 AND organization_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(project.id)
        .bind(project.organization_id)
        .fetch_all(pool)
        .await?)
    }

    /// Finds a document by id within the scope
    pub async fn find(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<Option<Self>> {
        match scope {
            TenantScope::Active(org_id) => Ok(sqlx::query_as::<_, Document>(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 AND organization_id = $2"
            ))
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await?),
            TenantScope::None => Ok(None),
            TenantScope::Unscoped => Ok(sqlx::query_as::<_, Document>(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
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

    /// Renames a document within the scope
    pub async fn rename(
        pool: &PgPool,
        scope: &TenantScope,
        id: Uuid,
        name: &str,
    ) -> CoreResult<Self> {
        let document = Self::fetch(pool, scope, id).await?;

        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Document name is required".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents
            SET name = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(document.organization_id)
        .bind(name.trim())
        .fetch_optional(pool)
        .await?
        .ok_or(CoreError::NotFound)?;

        Ok(updated)
    }

    /// Deletes a document row within the scope
    ///
    /// Returns the deleted row so the caller can remove the blob at
    /// `storage_path` afterwards.
    pub async fn delete(pool: &PgPool, scope: &TenantScope, id: Uuid) -> CoreResult<Self> {
        let document = Self::fetch(pool, scope, id).await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(document.organization_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(document)
    }
}
