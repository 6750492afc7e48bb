use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Claim lifecycle states. The transition graph is deliberately
/// unconstrained: an officer may move a claim to any state via a manual
/// status update, and `pending_documents` is entered manually only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    PendingDocuments,
}

impl ClaimStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::UnderReview => "under_review",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::PendingDocuments => "pending_documents",
        }
    }
}

/// Claim row as returned by list queries, joined with submitter and
/// assigned-officer display data.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClaimSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub claim_number: String,
    pub claim_type: String,
    pub status: String,
    pub priority: String,
    pub land_area: Option<f64>,
    pub land_location: Option<String>,
    pub state: String,
    pub district: String,
    pub village: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_officer: Option<Uuid>,
    pub estimated_completion: Option<NaiveDate>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub officer_name: Option<String>,
}

/// Full claim row for the single-claim view, including contact details and
/// resolution metadata.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClaimDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub claim_number: String,
    pub claim_type: String,
    pub status: String,
    pub priority: String,
    pub land_area: Option<f64>,
    pub land_location: Option<String>,
    pub gps_coordinates: Option<String>,
    pub state: String,
    pub district: String,
    pub village: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub assigned_officer: Option<Uuid>,
    pub estimated_completion: Option<NaiveDate>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub officer_name: Option<String>,
    pub officer_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let status: ClaimStatus = serde_json::from_str("\"pending_documents\"").unwrap();
        assert_eq!(status, ClaimStatus::PendingDocuments);
        assert_eq!(status.as_str(), "pending_documents");
    }
}
