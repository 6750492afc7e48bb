use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Full document row, including storage metadata and the owning claim's
/// user for access checks.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Per-claim listing entry: storage path stays server-side, verification
/// metadata is included.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocumentDetail {
    pub id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Trimmed view attached to claim responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
    pub verified: bool,
}
