use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Open,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

/// Feedback row joined with the linked claim number (when any) and, for the
/// reviewer listing, the submitter's display data.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub claim_id: Option<Uuid>,
    pub feedback_type: String,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub contact_method: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub claim_number: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}
