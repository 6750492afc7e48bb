//! Claim lifecycle: submission with claim-number generation, status
//! transitions, single-claim reads and scoped listings.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::claim::{ClaimDetail, ClaimStatus, ClaimSummary};
use crate::database::models::document::DocumentSummary;
use crate::middleware::AuthUser;
use crate::policy::{self, PolicyError};
use crate::services::event_service::{self, EventOrigin};
use crate::types::{normalize_limit, normalize_page, page_offset, PageMeta};

/// Attempts at claim-number generation before giving up. Collisions are
/// detected by the unique constraint, not by a racy pre-check.
const MAX_CLAIM_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("missing required fields")]
    Validation(HashMap<String, String>),

    #[error("claim not found")]
    NotFound,

    #[error("could not allocate a unique claim number")]
    ClaimNumberExhausted,

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimRequest {
    pub claim_type: Option<String>,
    pub land_area: Option<f64>,
    pub land_location: Option<String>,
    pub gps_coordinates: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedClaim {
    pub claim_id: Uuid,
    pub claim_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: ClaimStatus,
    pub rejection_reason: Option<String>,
    pub assigned_officer: Option<Uuid>,
    pub estimated_completion: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClaimListFilter {
    pub status: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
}

/// 30-day status breakdown for the reviewer stats endpoint.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatsOverview {
    pub total_claims: i64,
    pub submitted: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub avg_processing_days: Option<f64>,
}

pub struct ClaimService {
    pool: PgPool,
}

impl ClaimService {
    pub async fn new() -> Result<Self, ClaimError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Submit a new claim. The claim number is generated here and retried on
    /// a unique-constraint conflict, so two concurrent submissions can never
    /// end up sharing a number.
    pub async fn submit(
        &self,
        requester: &AuthUser,
        req: SubmitClaimRequest,
        origin: &EventOrigin,
    ) -> Result<SubmittedClaim, ClaimError> {
        let field_errors = validate_submission(&req);
        if !field_errors.is_empty() {
            return Err(ClaimError::Validation(field_errors));
        }

        let state = req.state.as_deref().unwrap_or_default();
        let claim_id = Uuid::new_v4();
        let year = Utc::now().year();

        for attempt in 1..=MAX_CLAIM_NUMBER_ATTEMPTS {
            let serial = rand::thread_rng().gen_range(0..1_000_000);
            let claim_number = generate_claim_number(state, year, serial);

            let result = sqlx::query(
                r#"
                INSERT INTO claims (
                    id, user_id, claim_number, claim_type, land_area, land_location,
                    gps_coordinates, state, district, village
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(claim_id)
            .bind(requester.id)
            .bind(&claim_number)
            .bind(&req.claim_type)
            .bind(req.land_area)
            .bind(&req.land_location)
            .bind(&req.gps_coordinates)
            .bind(&req.state)
            .bind(&req.district)
            .bind(&req.village)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    event_service::record(
                        &self.pool,
                        "claim_submitted",
                        json!({ "claim_number": claim_number }),
                        Some(requester.id),
                        Some(claim_id),
                        origin,
                    )
                    .await;

                    return Ok(SubmittedClaim {
                        claim_id,
                        claim_number,
                    });
                }
                Err(e) if is_claim_number_conflict(&e) => {
                    tracing::warn!(
                        attempt,
                        "claim number collision on {}, regenerating",
                        claim_number
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ClaimError::ClaimNumberExhausted)
    }

    /// Officer/admin status update. Only supplied optional fields are
    /// written; omitted fields keep their prior values. Approval and
    /// rejection timestamps are mutually exclusive: stamping one clears the
    /// other.
    pub async fn update_status(
        &self,
        requester: &AuthUser,
        claim_id: Uuid,
        req: UpdateStatusRequest,
        origin: &EventOrigin,
    ) -> Result<(), ClaimError> {
        policy::require_reviewer(requester)?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE claims SET status = ");
        qb.push_bind(req.status.as_str());
        qb.push(", updated_at = now()");

        if let Some(reason) = &req.rejection_reason {
            qb.push(", rejection_reason = ");
            qb.push_bind(reason);
        }
        if let Some(officer) = req.assigned_officer {
            qb.push(", assigned_officer = ");
            qb.push_bind(officer);
        }
        if let Some(date) = req.estimated_completion {
            qb.push(", estimated_completion = ");
            qb.push_bind(date);
        }

        qb.push(resolution_timestamps(req.status));

        qb.push(" WHERE id = ");
        qb.push_bind(claim_id);

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ClaimError::NotFound);
        }

        event_service::record(
            &self.pool,
            "claim_status_changed",
            json!({ "status": req.status.as_str() }),
            Some(requester.id),
            Some(claim_id),
            origin,
        )
        .await;

        Ok(())
    }

    /// Single claim with submitter/officer display data and attached
    /// documents, newest upload first.
    pub async fn get(
        &self,
        requester: &AuthUser,
        claim_id: Uuid,
    ) -> Result<(ClaimDetail, Vec<DocumentSummary>), ClaimError> {
        let claim: Option<ClaimDetail> = sqlx::query_as(
            r#"
            SELECT
                c.id, c.user_id, c.claim_number, c.claim_type, c.status, c.priority,
                c.land_area, c.land_location, c.gps_coordinates, c.state, c.district,
                c.village, c.submitted_at, c.updated_at, c.approved_at, c.rejected_at,
                c.rejection_reason, c.assigned_officer, c.estimated_completion,
                u.full_name AS user_name,
                u.email AS user_email,
                u.phone AS user_phone,
                o.full_name AS officer_name,
                o.email AS officer_email
            FROM claims c
            LEFT JOIN users u ON c.user_id = u.id
            LEFT JOIN users o ON c.assigned_officer = o.id
            WHERE c.id = $1
            "#,
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;

        let claim = claim.ok_or(ClaimError::NotFound)?;
        policy::ensure_record_access(requester, claim.user_id)?;

        let documents: Vec<DocumentSummary> = sqlx::query_as(
            r#"
            SELECT id, document_type, file_name, file_size, uploaded_at, verified
            FROM documents
            WHERE claim_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((claim, documents))
    }

    /// Paged listing. Citizens are implicitly scoped to their own claims;
    /// reviewers see everything matching the filters.
    pub async fn list(
        &self,
        requester: &AuthUser,
        filter: &ClaimListFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<(Vec<ClaimSummary>, PageMeta), ClaimError> {
        let page = normalize_page(page);
        let limit = normalize_limit(limit);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                c.id, c.user_id, c.claim_number, c.claim_type, c.status, c.priority,
                c.land_area, c.land_location, c.state, c.district, c.village,
                c.submitted_at, c.updated_at, c.assigned_officer, c.estimated_completion,
                u.full_name AS user_name,
                u.email AS user_email,
                o.full_name AS officer_name
            FROM claims c
            LEFT JOIN users u ON c.user_id = u.id
            LEFT JOIN users o ON c.assigned_officer = o.id
            WHERE 1=1
            "#,
        );
        push_claim_filters(&mut qb, requester, filter);
        qb.push(" ORDER BY c.submitted_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(page_offset(page, limit));

        let claims: Vec<ClaimSummary> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM claims c WHERE 1=1");
        push_claim_filters(&mut count_qb, requester, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((claims, PageMeta::new(page, limit, total)))
    }

    /// 30-day status breakdown plus mean processing time, reviewer only.
    pub async fn stats_overview(&self, requester: &AuthUser) -> Result<StatsOverview, ClaimError> {
        policy::require_reviewer(requester)?;

        let stats: StatsOverview = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_claims,
                COUNT(*) FILTER (WHERE status = 'submitted') AS submitted,
                COUNT(*) FILTER (WHERE status = 'under_review') AS under_review,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                (AVG(EXTRACT(EPOCH FROM (COALESCE(approved_at, rejected_at) - submitted_at)) / 86400.0)
                    FILTER (WHERE approved_at IS NOT NULL OR rejected_at IS NOT NULL)
                )::double precision AS avg_processing_days
            FROM claims
            WHERE submitted_at >= now() - interval '30 days'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

fn push_claim_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    requester: &AuthUser,
    filter: &ClaimListFilter,
) {
    if !requester.role.is_reviewer() {
        qb.push(" AND c.user_id = ");
        qb.push_bind(requester.id);
    }
    if let Some(status) = &filter.status {
        qb.push(" AND c.status = ");
        qb.push_bind(status.clone());
    }
    if let Some(state) = &filter.state {
        qb.push(" AND c.state = ");
        qb.push_bind(state.clone());
    }
    if let Some(district) = &filter.district {
        qb.push(" AND c.district = ");
        qb.push_bind(district.clone());
    }
}

/// Required fields for submission, reported per field.
fn validate_submission(req: &SubmitClaimRequest) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    let mut require = |name: &str, value: &Option<String>| {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.insert(name.to_string(), "This field is required".to_string());
        }
    };

    require("claimType", &req.claim_type);
    require("landLocation", &req.land_location);
    require("state", &req.state);
    require("district", &req.district);
    errors
}

/// Claim numbers follow `FRA/<state code>/<year>/<6-digit serial>`. The
/// state code takes the initials of the first two words ("Madhya Pradesh"
/// -> "MP"), falling back to the first two letters for single-word states
/// ("Tripura" -> "TR").
pub fn generate_claim_number(state: &str, year: i32, serial: u32) -> String {
    format!("FRA/{}/{}/{:06}", state_code(state), year, serial % 1_000_000)
}

fn state_code(state: &str) -> String {
    let words: Vec<&str> = state.split_whitespace().collect();
    let code: String = if words.len() >= 2 {
        words
            .iter()
            .take(2)
            .filter_map(|w| w.chars().next())
            .collect()
    } else {
        state.chars().filter(|c| c.is_alphabetic()).take(2).collect()
    };
    code.to_uppercase()
}

/// SET-clause fragment stamping the resolution timestamp for a status.
/// Approving clears any prior rejection timestamp and vice versa, so the
/// two can never be set on the same row. Other statuses leave both alone.
fn resolution_timestamps(status: ClaimStatus) -> &'static str {
    match status {
        ClaimStatus::Approved => ", approved_at = now(), rejected_at = NULL",
        ClaimStatus::Rejected => ", rejected_at = now(), approved_at = NULL",
        _ => "",
    }
}

fn is_claim_number_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => db
            .constraint()
            .map_or(true, |name| name.contains("claim_number")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_number_matches_documented_pattern() {
        let number = generate_claim_number("Madhya Pradesh", 2025, 1247);
        assert_eq!(number, "FRA/MP/2025/001247");

        let parts: Vec<&str> = number.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "FRA");
        assert_eq!(parts[3].len(), 6);
        assert!(parts[3].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn single_word_state_uses_first_two_letters() {
        assert_eq!(generate_claim_number("Tripura", 2025, 7), "FRA/TR/2025/000007");
        assert_eq!(generate_claim_number("Odisha", 2024, 999_999), "FRA/OD/2024/999999");
    }

    #[test]
    fn serial_is_always_six_digits() {
        let number = generate_claim_number("Assam", 2025, 1_234_567);
        let serial = number.rsplit('/').next().unwrap();
        assert_eq!(serial.len(), 6);
    }

    #[test]
    fn approving_clears_the_rejection_timestamp() {
        let sql = resolution_timestamps(ClaimStatus::Approved);
        assert!(sql.contains("approved_at = now()"));
        assert!(sql.contains("rejected_at = NULL"));
    }

    #[test]
    fn rejecting_clears_the_approval_timestamp() {
        let sql = resolution_timestamps(ClaimStatus::Rejected);
        assert!(sql.contains("rejected_at = now()"));
        assert!(sql.contains("approved_at = NULL"));
    }

    #[test]
    fn non_terminal_statuses_leave_resolution_timestamps_alone() {
        assert_eq!(resolution_timestamps(ClaimStatus::Submitted), "");
        assert_eq!(resolution_timestamps(ClaimStatus::UnderReview), "");
        assert_eq!(resolution_timestamps(ClaimStatus::PendingDocuments), "");
    }

    #[test]
    fn submission_requires_core_fields() {
        let req = SubmitClaimRequest {
            claim_type: Some("Individual Forest Rights".into()),
            land_area: None,
            land_location: None,
            gps_coordinates: None,
            state: Some("  ".into()),
            district: Some("Bhopal".into()),
            village: None,
        };
        let errors = validate_submission(&req);
        assert!(errors.contains_key("landLocation"));
        assert!(errors.contains_key("state"));
        assert!(!errors.contains_key("claimType"));
        assert!(!errors.contains_key("district"));
    }

    #[test]
    fn complete_submission_passes_validation() {
        let req = SubmitClaimRequest {
            claim_type: Some("Community Rights".into()),
            land_area: Some(2.5),
            land_location: Some("Village Khajuraho".into()),
            gps_coordinates: Some("23.8315,77.4126".into()),
            state: Some("Madhya Pradesh".into()),
            district: Some("Bhopal".into()),
            village: Some("Khajuraho".into()),
        };
        assert!(validate_submission(&req).is_empty());
    }
}
