//! Document metadata lifecycle. Upload mechanics (multipart parsing, disk
//! writes) belong to the storage collaborator; this service persists and
//! serves the resulting metadata, gated by the claim's ownership.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::document::{Document, DocumentDetail};
use crate::middleware::AuthUser;
use crate::policy::{self, PolicyError};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("missing required fields")]
    Validation(HashMap<String, String>),

    #[error("claim not found")]
    ClaimNotFound,

    #[error("document not found")]
    NotFound,

    #[error("file missing from storage")]
    FileMissing,

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Storage-collaborator metadata for one uploaded file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub document_type: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDocumentsRequest {
    pub claim_id: Option<Uuid>,
    pub documents: Vec<DocumentUpload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDocument {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub document_type: String,
}

#[derive(Debug, FromRow)]
struct DocumentWithOwner {
    #[sqlx(flatten)]
    document: Document,
    owner_id: Uuid,
}

pub struct DocumentService {
    pool: PgPool,
}

impl DocumentService {
    pub async fn new() -> Result<Self, DocumentError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Register uploaded-file metadata against a claim the requester may
    /// mutate. The physical write has already completed by the time this is
    /// called; a failed insert surfaces as an error so no orphan record
    /// becomes user-visible.
    pub async fn register(
        &self,
        requester: &AuthUser,
        req: RegisterDocumentsRequest,
    ) -> Result<Vec<RegisteredDocument>, DocumentError> {
        let claim_id = match req.claim_id {
            Some(id) => id,
            None => {
                let mut errors = HashMap::new();
                errors.insert("claimId".to_string(), "This field is required".to_string());
                return Err(DocumentError::Validation(errors));
            }
        };

        let field_errors = validate_uploads(&req.documents);
        if !field_errors.is_empty() {
            return Err(DocumentError::Validation(field_errors));
        }

        let owner_id = self
            .claim_owner(claim_id)
            .await?
            .ok_or(DocumentError::ClaimNotFound)?;
        policy::ensure_record_access(requester, owner_id)?;

        let mut registered = Vec::with_capacity(req.documents.len());
        for upload in &req.documents {
            let document_id = Uuid::new_v4();
            let document_type = upload
                .document_type
                .clone()
                .unwrap_or_else(|| "general".to_string());

            sqlx::query(
                r#"
                INSERT INTO documents (
                    id, claim_id, user_id, document_type, file_name, file_path,
                    file_size, mime_type
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(document_id)
            .bind(claim_id)
            .bind(requester.id)
            .bind(&document_type)
            .bind(&upload.file_name)
            .bind(&upload.file_path)
            .bind(upload.file_size)
            .bind(&upload.mime_type)
            .execute(&self.pool)
            .await?;

            registered.push(RegisteredDocument {
                id: document_id,
                file_name: upload.file_name.clone().unwrap_or_default(),
                file_size: upload.file_size,
                document_type,
            });
        }

        Ok(registered)
    }

    /// Documents attached to a claim, newest first.
    pub async fn list_for_claim(
        &self,
        requester: &AuthUser,
        claim_id: Uuid,
    ) -> Result<Vec<DocumentDetail>, DocumentError> {
        let owner_id = self
            .claim_owner(claim_id)
            .await?
            .ok_or(DocumentError::ClaimNotFound)?;
        policy::ensure_record_access(requester, owner_id)?;

        let documents: Vec<DocumentDetail> = sqlx::query_as(
            r#"
            SELECT
                id, document_type, file_name, file_size, mime_type,
                uploaded_at, verified, verified_by, verified_at
            FROM documents
            WHERE claim_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Resolve a document for download: access is checked against the
    /// owning claim, and the stored file must still exist.
    pub async fn get_for_download(
        &self,
        requester: &AuthUser,
        document_id: Uuid,
    ) -> Result<Document, DocumentError> {
        let row = self
            .fetch_with_owner(document_id)
            .await?
            .ok_or(DocumentError::NotFound)?;
        policy::ensure_record_access(requester, row.owner_id)?;

        if !tokio::fs::try_exists(&row.document.file_path)
            .await
            .unwrap_or(false)
        {
            return Err(DocumentError::FileMissing);
        }

        Ok(row.document)
    }

    /// Officer/admin verification flag update.
    pub async fn verify(
        &self,
        requester: &AuthUser,
        document_id: Uuid,
        verified: bool,
    ) -> Result<(), DocumentError> {
        policy::require_reviewer(requester)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET verified = $1, verified_by = $2, verified_at = now()
            WHERE id = $3
            "#,
        )
        .bind(verified)
        .bind(requester.id)
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DocumentError::NotFound);
        }
        Ok(())
    }

    /// Delete a document record and its stored file. The physical removal
    /// is best-effort: a file already missing from storage must not block
    /// deleting the logical record.
    pub async fn delete(
        &self,
        requester: &AuthUser,
        document_id: Uuid,
    ) -> Result<(), DocumentError> {
        let row = self
            .fetch_with_owner(document_id)
            .await?
            .ok_or(DocumentError::NotFound)?;
        policy::ensure_record_access(requester, row.owner_id)?;

        remove_stored_file(&row.document.file_path).await;

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn claim_owner(&self, claim_id: Uuid) -> Result<Option<Uuid>, DocumentError> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM claims WHERE id = $1")
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn fetch_with_owner(
        &self,
        document_id: Uuid,
    ) -> Result<Option<DocumentWithOwner>, DocumentError> {
        let row: Option<DocumentWithOwner> = sqlx::query_as(
            r#"
            SELECT
                d.id, d.claim_id, d.user_id, d.document_type, d.file_name, d.file_path,
                d.file_size, d.mime_type, d.uploaded_at, d.verified, d.verified_by,
                d.verified_at,
                c.user_id AS owner_id
            FROM documents d
            JOIN claims c ON d.claim_id = c.id
            WHERE d.id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// Best-effort physical deletion; failures are logged, never escalated.
async fn remove_stored_file(path: &str) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("failed to delete stored file {}: {}", path, e);
    }
}

fn validate_uploads(documents: &[DocumentUpload]) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    if documents.is_empty() {
        errors.insert(
            "documents".to_string(),
            "At least one document is required".to_string(),
        );
        return errors;
    }

    for (idx, upload) in documents.iter().enumerate() {
        if upload.file_name.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.insert(
                format!("documents[{}].fileName", idx),
                "This field is required".to_string(),
            );
        }
        if upload.file_path.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.insert(
                format!("documents[{}].filePath", idx),
                "This field is required".to_string(),
            );
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removing_a_missing_file_does_not_panic() {
        // The delete flow treats a missing physical file as a warning only.
        remove_stored_file("/nonexistent/path/to/file.pdf").await;
    }

    #[test]
    fn uploads_require_name_and_path() {
        let uploads = vec![DocumentUpload {
            document_type: None,
            file_name: None,
            file_path: Some("/uploads/doc-1.pdf".into()),
            file_size: Some(1024),
            mime_type: Some("application/pdf".into()),
        }];
        let errors = validate_uploads(&uploads);
        assert!(errors.contains_key("documents[0].fileName"));
        assert!(!errors.contains_key("documents[0].filePath"));
    }

    #[test]
    fn empty_upload_list_is_rejected() {
        let errors = validate_uploads(&[]);
        assert!(errors.contains_key("documents"));
    }
}
