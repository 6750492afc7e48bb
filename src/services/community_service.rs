//! Citizen feedback and the merged notification feed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::feedback::{FeedbackRecord, FeedbackStatus};
use crate::middleware::AuthUser;
use crate::policy::{self, PolicyError};
use crate::services::event_service::{self, EventOrigin};
use crate::types::{normalize_limit, normalize_page, page_offset, PageMeta};

/// The merged feed never exceeds this many entries.
const NOTIFICATION_FEED_LIMIT: usize = 10;

/// Each source contributes at most this many entries before the merge.
const NOTIFICATION_SOURCE_LIMIT: i64 = 5;

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("missing required fields")]
    Validation(HashMap<String, String>),

    #[error("feedback not found")]
    NotFound,

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub claim_id: Option<Uuid>,
    pub feedback_type: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub priority: Option<String>,
    pub contact_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackListFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackStatusRequest {
    pub status: FeedbackStatus,
}

/// One entry of the merged notification feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<Uuid>,
}

pub struct CommunityService {
    pool: PgPool,
}

impl CommunityService {
    pub async fn new() -> Result<Self, CommunityError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Any authenticated user may file feedback, optionally linked to one
    /// of their claims.
    pub async fn submit_feedback(
        &self,
        requester: &AuthUser,
        req: SubmitFeedbackRequest,
        origin: &EventOrigin,
    ) -> Result<Uuid, CommunityError> {
        let field_errors = validate_feedback(&req);
        if !field_errors.is_empty() {
            return Err(CommunityError::Validation(field_errors));
        }

        let feedback_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO feedback (
                id, user_id, claim_id, feedback_type, subject, message,
                priority, contact_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(feedback_id)
        .bind(requester.id)
        .bind(req.claim_id)
        .bind(&req.feedback_type)
        .bind(&req.subject)
        .bind(&req.message)
        .bind(req.priority.as_deref().unwrap_or("low"))
        .bind(&req.contact_method)
        .execute(&self.pool)
        .await?;

        event_service::record(
            &self.pool,
            "feedback_submitted",
            json!({ "feedback_type": req.feedback_type }),
            Some(requester.id),
            req.claim_id,
            origin,
        )
        .await;

        Ok(feedback_id)
    }

    /// The requester's own feedback, newest first.
    pub async fn list_own_feedback(
        &self,
        requester: &AuthUser,
    ) -> Result<Vec<FeedbackRecord>, CommunityError> {
        let feedback: Vec<FeedbackRecord> = sqlx::query_as(
            r#"
            SELECT
                f.id, f.user_id, f.claim_id, f.feedback_type, f.subject, f.message,
                f.priority, f.status, f.contact_method, f.submitted_at, f.updated_at,
                f.resolved_at, f.resolved_by,
                c.claim_number,
                NULL::text AS user_name,
                NULL::text AS user_email
            FROM feedback f
            LEFT JOIN claims c ON f.claim_id = c.id
            WHERE f.user_id = $1
            ORDER BY f.submitted_at DESC
            "#,
        )
        .bind(requester.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feedback)
    }

    /// All feedback across users, reviewer only, most urgent first.
    pub async fn list_all_feedback(
        &self,
        requester: &AuthUser,
        filter: &FeedbackListFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<(Vec<FeedbackRecord>, PageMeta), CommunityError> {
        policy::require_reviewer(requester)?;

        let page = normalize_page(page);
        let limit = normalize_limit(limit);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                f.id, f.user_id, f.claim_id, f.feedback_type, f.subject, f.message,
                f.priority, f.status, f.contact_method, f.submitted_at, f.updated_at,
                f.resolved_at, f.resolved_by,
                c.claim_number,
                u.full_name AS user_name,
                u.email AS user_email
            FROM feedback f
            JOIN users u ON f.user_id = u.id
            LEFT JOIN claims c ON f.claim_id = c.id
            WHERE 1=1
            "#,
        );
        push_feedback_filters(&mut qb, filter);
        qb.push(
            r#"
            ORDER BY
                CASE f.priority
                    WHEN 'urgent' THEN 1
                    WHEN 'high' THEN 2
                    WHEN 'medium' THEN 3
                    WHEN 'low' THEN 4
                END,
                f.submitted_at DESC
            LIMIT "#,
        );
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(page_offset(page, limit));

        let feedback: Vec<FeedbackRecord> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM feedback f WHERE 1=1");
        push_feedback_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((feedback, PageMeta::new(page, limit, total)))
    }

    /// Officer/admin status update; resolving stamps the resolution
    /// metadata used by the notification feed.
    pub async fn update_feedback_status(
        &self,
        requester: &AuthUser,
        feedback_id: Uuid,
        req: UpdateFeedbackStatusRequest,
    ) -> Result<(), CommunityError> {
        policy::require_reviewer(requester)?;

        let result = match req.status {
            FeedbackStatus::Resolved => {
                sqlx::query(
                    r#"
                    UPDATE feedback
                    SET status = $1, updated_at = now(), resolved_at = now(), resolved_by = $2
                    WHERE id = $3
                    "#,
                )
                .bind(req.status.as_str())
                .bind(requester.id)
                .bind(feedback_id)
                .execute(&self.pool)
                .await?
            }
            FeedbackStatus::Open => {
                sqlx::query("UPDATE feedback SET status = $1, updated_at = now() WHERE id = $2")
                    .bind(req.status.as_str())
                    .bind(feedback_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(CommunityError::NotFound);
        }
        Ok(())
    }

    /// Merged notification feed: claim status changes and feedback
    /// resolutions over the requester's own records in the last 7 days,
    /// newest first, capped at 10.
    pub async fn notifications(
        &self,
        requester: &AuthUser,
    ) -> Result<Vec<Notification>, CommunityError> {
        let claim_updates: Vec<(String, DateTime<Utc>, String)> = sqlx::query_as(
            r#"
            SELECT status, updated_at, claim_number
            FROM claims
            WHERE user_id = $1
            AND updated_at >= now() - interval '7 days'
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(requester.id)
        .bind(NOTIFICATION_SOURCE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let feedback_responses: Vec<(String, DateTime<Utc>, Uuid)> = sqlx::query_as(
            r#"
            SELECT subject, resolved_at, id
            FROM feedback
            WHERE user_id = $1
            AND resolved_at IS NOT NULL
            AND resolved_at >= now() - interval '7 days'
            ORDER BY resolved_at DESC
            LIMIT $2
            "#,
        )
        .bind(requester.id)
        .bind(NOTIFICATION_SOURCE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut items: Vec<Notification> = claim_updates
            .into_iter()
            .map(|(status, updated_at, claim_number)| Notification {
                kind: "claim_update".to_string(),
                message: format!("Claim status updated to: {}", status),
                timestamp: updated_at,
                claim_number: Some(claim_number),
                feedback_id: None,
            })
            .collect();

        items.extend(
            feedback_responses
                .into_iter()
                .map(|(subject, resolved_at, id)| Notification {
                    kind: "feedback_response".to_string(),
                    message: format!("Response received for: {}", subject),
                    timestamp: resolved_at,
                    claim_number: None,
                    feedback_id: Some(id),
                }),
        );

        Ok(merge_notifications(items))
    }
}

fn push_feedback_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &FeedbackListFilter) {
    if let Some(status) = &filter.status {
        qb.push(" AND f.status = ");
        qb.push_bind(status.clone());
    }
    if let Some(priority) = &filter.priority {
        qb.push(" AND f.priority = ");
        qb.push_bind(priority.clone());
    }
}

/// Sort merged sources by timestamp descending and truncate to the feed cap.
pub fn merge_notifications(mut items: Vec<Notification>) -> Vec<Notification> {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(NOTIFICATION_FEED_LIMIT);
    items
}

fn validate_feedback(req: &SubmitFeedbackRequest) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    let mut require = |name: &str, value: &Option<String>| {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.insert(name.to_string(), "This field is required".to_string());
        }
    };

    require("feedbackType", &req.feedback_type);
    require("subject", &req.subject);
    require("message", &req.message);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(kind: &str, hour: u32) -> Notification {
        Notification {
            kind: kind.to_string(),
            message: format!("{} at {}", kind, hour),
            timestamp: Utc.with_ymd_and_hms(2025, 8, 20, hour, 0, 0).unwrap(),
            claim_number: None,
            feedback_id: None,
        }
    }

    #[test]
    fn feed_is_sorted_newest_first_and_capped() {
        let mut items = Vec::new();
        for hour in 0..7 {
            items.push(note("claim_update", hour));
        }
        for hour in 7..13 {
            items.push(note("feedback_response", hour));
        }

        let merged = merge_notifications(items);
        assert_eq!(merged.len(), 10);
        for pair in merged.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
        // Newest entry survives the cut.
        assert_eq!(merged[0].message, "feedback_response at 12");
    }

    #[test]
    fn feed_smaller_than_cap_is_untouched() {
        let merged = merge_notifications(vec![note("claim_update", 3), note("claim_update", 9)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].message, "claim_update at 9");
    }

    #[test]
    fn feedback_requires_type_subject_and_message() {
        let req = SubmitFeedbackRequest {
            claim_id: None,
            feedback_type: Some("complaint".into()),
            subject: None,
            message: Some("".into()),
            priority: None,
            contact_method: None,
        };
        let errors = validate_feedback(&req);
        assert!(errors.contains_key("subject"));
        assert!(errors.contains_key("message"));
        assert!(!errors.contains_key("feedbackType"));
    }
}
