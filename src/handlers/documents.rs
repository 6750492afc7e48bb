use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::document_service::{DocumentService, RegisterDocumentsRequest};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub verified: bool,
}

/// POST /api/documents - register uploaded-file metadata against a claim
pub async fn register(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RegisterDocumentsRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = DocumentService::new().await?;
    let files = service.register(&user, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "message": "Documents uploaded successfully",
                "files": files
            }
        })),
    ))
}

/// GET /api/documents/claim/:claim_id - documents attached to a claim
pub async fn list_for_claim(
    Extension(user): Extension<AuthUser>,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = DocumentService::new().await?;
    let documents = service.list_for_claim(&user, claim_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "documents": documents }
    })))
}

/// GET /api/documents/:id/download - resolve storage metadata for download
pub async fn download(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = DocumentService::new().await?;
    let document = service.get_for_download(&user, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "fileName": document.file_name,
            "filePath": document.file_path,
            "fileSize": document.file_size,
            "mimeType": document.mime_type
        }
    })))
}

/// PUT /api/documents/:id/verify - officer/admin verification flag
pub async fn verify(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<Value>, ApiError> {
    let service = DocumentService::new().await?;
    service.verify(&user, id, payload.verified).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Document verification status updated" }
    })))
}

/// DELETE /api/documents/:id - delete record and stored file
pub async fn remove(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = DocumentService::new().await?;
    service.delete(&user, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Document deleted successfully" }
    })))
}
