/// Document endpoints
///
/// Uploads are multipart: a required `file` part and an optional `name`
/// part overriding the display name. Bytes go to the blob store first,
/// then the metadata row; if the row insert fails the blob is removed
/// again so nothing is orphaned.
///
/// # Endpoints
///
/// - `GET    /v1/projects/:project_id/documents` - List
/// - `POST   /v1/projects/:project_id/documents` - Upload (multipart)
/// - `GET    /v1/documents/:document_id/download` - Download bytes
/// - `PATCH  /v1/documents/:document_id` - Rename
/// - `DELETE /v1/documents/:document_id` - Delete row and blob

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use orgdesk_shared::{
    models::{
        document::{CreateDocument, Document},
        project::Project,
    },
    storage::{document_key, MAX_DOCUMENT_BYTES},
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

/// Rename request
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    /// New display name
    pub name: String,
}

/// Lists documents for a project, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Document>>> {
    let documents = Document::list_by_project(&state.db, &ctx.scope, project_id).await?;
    Ok(Json(documents))
}

/// Uploaded file pulled out of the multipart body
struct Upload {
    filename: String,
    mime_type: String,
    data: Bytes,
    name_override: Option<String>,
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<Upload> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut name_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file part: {}", e))
                })?;
                file = Some((filename, mime_type, data));
            }
            Some("name") => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read name part: {}", e))
                })?;
                if !value.trim().is_empty() {
                    name_override = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, mime_type, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing file part".to_string()))?;

    if data.is_empty() {
        return Err(ApiError::Unprocessable("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_DOCUMENT_BYTES {
        return Err(ApiError::Unprocessable(
            "Document exceeds the 10 MB size limit".to_string(),
        ));
    }

    Ok(Upload {
        filename,
        mime_type,
        data,
        name_override,
    })
}

/// Uploads a document into a project
pub async fn upload(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    // Resolve the project first so a bad target fails before any blob
    // write happens.
    let project = Project::fetch(&state.db, &ctx.scope, project_id).await?;

    let upload = read_multipart(multipart).await?;

    let key = document_key(project.organization_id, project.id, &upload.filename);
    let size_bytes = upload.data.len() as i64;

    state
        .storage
        .put(&key, upload.data)
        .await
        .map_err(|e| ApiError::InternalError(format!("Blob write failed: {}", e)))?;

    let name = upload.name_override.unwrap_or(upload.filename);

    let document = Document::create(
        &state.db,
        &ctx.scope,
        project.id,
        ctx.user.id,
        CreateDocument {
            name,
            storage_path: key.clone(),
            mime_type: upload.mime_type,
            size_bytes,
        },
    )
    .await;

    match document {
        Ok(document) => Ok((StatusCode::CREATED, Json(document))),
        Err(e) => {
            // Don't leave an orphaned blob behind.
            if let Err(cleanup) = state.storage.delete(&key).await {
                warn!(key = %key, error = %cleanup, "orphaned blob cleanup failed");
            }
            Err(e.into())
        }
    }
}

/// Downloads a document's bytes
pub async fn download(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = Document::fetch(&state.db, &ctx.scope, document_id).await?;

    let data = state
        .storage
        .get(&document.storage_path)
        .await
        .map_err(|e| ApiError::InternalError(format!("Blob read failed: {}", e)))?;

    let Some(data) = data else {
        // Row without a blob; treat as missing rather than erroring.
        error!(
            document_id = %document.id,
            storage_path = %document.storage_path,
            "document row has no backing blob"
        );
        return Err(ApiError::NotFound("Resource not found".to_string()));
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.name.replace(['"', '\\'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, document.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// Renames a document
pub async fn rename(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(document_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<Document>> {
    let document = Document::rename(&state.db, &ctx.scope, document_id, &req.name).await?;
    Ok(Json(document))
}

/// Deletes a document and its stored bytes
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let document = Document::delete(&state.db, &ctx.scope, document_id).await?;

    if let Err(e) = state.storage.delete(&document.storage_path).await {
        warn!(
            document_id = %document.id,
            storage_path = %document.storage_path,
            error = %e,
            "blob cleanup after document delete failed"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
