//! Analytics aggregation: dashboard KPIs, jurisdiction risk scoring,
//! monthly trends and a naive linear forecast. The risk score and forecast
//! reproduce the behavior the dashboards were built against; they are
//! documented heuristics, not statistical models.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::alert::{AlertSeverity, SystemAlert};
use crate::middleware::AuthUser;
use crate::policy::{self, PolicyError};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("missing required fields")]
    Validation(HashMap<String, String>),

    #[error("alert not found")]
    AlertNotFound,

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Per-jurisdiction rejection/volume inputs for the risk score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RiskFactor {
    pub state: String,
    pub claim_count: i64,
    pub rejection_count: i64,
}

/// One calendar month of claim activity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub month: String,
    pub submitted: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub period: String,
    pub predicted: i64,
    pub confidence: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    pub total_claims: i64,
    pub approval_rate: f64,
    pub avg_processing_time: i64,
    pub risk_score: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub kpis: DashboardKpis,
    pub trends: Vec<TrendPoint>,
    pub predictions: Vec<ForecastPoint>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub alert_type: Option<String>,
    pub severity: AlertSeverity,
    pub title: Option<String>,
    pub description: Option<String>,
    pub affected_area: Option<String>,
}

pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub async fn new() -> Result<Self, AnalyticsError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Dashboard summary over a 30-day window (90 days for processing
    /// time), reviewer only.
    pub async fn dashboard(&self, requester: &AuthUser) -> Result<Dashboard, AnalyticsError> {
        policy::require_reviewer(requester)?;

        let total_claims: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM claims WHERE submitted_at >= now() - interval '30 days'",
        )
        .fetch_one(&self.pool)
        .await?;

        let (window_total, window_approved): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'approved')
            FROM claims
            WHERE submitted_at >= now() - interval '30 days'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let avg_days: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT (AVG(EXTRACT(EPOCH FROM (COALESCE(approved_at, rejected_at) - submitted_at)) / 86400.0))::double precision
            FROM claims
            WHERE (approved_at IS NOT NULL OR rejected_at IS NOT NULL)
            AND submitted_at >= now() - interval '90 days'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let risk_factors: Vec<RiskFactor> = sqlx::query_as(
            r#"
            SELECT
                state,
                COUNT(*) AS claim_count,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejection_count
            FROM claims
            WHERE submitted_at >= now() - interval '30 days'
            GROUP BY state
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let trends = self.monthly_trend().await?;
        let predictions = forecast(&trends, Utc::now());

        Ok(Dashboard {
            kpis: DashboardKpis {
                total_claims,
                approval_rate: approval_rate(window_approved, window_total),
                avg_processing_time: avg_days.map_or(0, |d| d.round() as i64),
                risk_score: round_to_tenth(risk_score(&risk_factors)),
            },
            trends,
            predictions,
            last_updated: Utc::now(),
        })
    }

    /// Claims grouped by calendar month over the trailing 12 months,
    /// chronological ascending.
    pub async fn monthly_trend(&self) -> Result<Vec<TrendPoint>, AnalyticsError> {
        let trends: Vec<TrendPoint> = sqlx::query_as(
            r#"
            SELECT
                to_char(submitted_at, 'YYYY-MM') AS month,
                COUNT(*) AS submitted,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected
            FROM claims
            WHERE submitted_at >= now() - interval '12 months'
            GROUP BY to_char(submitted_at, 'YYYY-MM')
            ORDER BY month
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(trends)
    }

    /// Active alerts, most severe first, capped at the 10 most relevant.
    pub async fn list_active_alerts(
        &self,
        requester: &AuthUser,
    ) -> Result<Vec<SystemAlert>, AnalyticsError> {
        policy::require_reviewer(requester)?;

        let alerts: Vec<SystemAlert> = sqlx::query_as(
            r#"
            SELECT *
            FROM system_alerts
            WHERE status = 'active'
            ORDER BY
                CASE severity
                    WHEN 'high' THEN 1
                    WHEN 'medium' THEN 2
                    WHEN 'low' THEN 3
                END,
                created_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Admin-only alert creation; stricter than resolving existing alerts.
    pub async fn create_alert(
        &self,
        requester: &AuthUser,
        req: CreateAlertRequest,
    ) -> Result<Uuid, AnalyticsError> {
        policy::require_admin(requester)?;

        let field_errors = validate_alert(&req);
        if !field_errors.is_empty() {
            return Err(AnalyticsError::Validation(field_errors));
        }

        let alert_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO system_alerts (id, alert_type, severity, title, description, affected_area)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(alert_id)
        .bind(&req.alert_type)
        .bind(req.severity.as_str())
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.affected_area)
        .execute(&self.pool)
        .await?;

        Ok(alert_id)
    }

    pub async fn resolve_alert(
        &self,
        requester: &AuthUser,
        alert_id: Uuid,
    ) -> Result<(), AnalyticsError> {
        policy::require_reviewer(requester)?;

        let result = sqlx::query(
            r#"
            UPDATE system_alerts
            SET status = 'resolved', resolved_at = now(), resolved_by = $1
            WHERE id = $2
            "#,
        )
        .bind(requester.id)
        .bind(alert_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AnalyticsError::AlertNotFound);
        }
        Ok(())
    }
}

fn validate_alert(req: &CreateAlertRequest) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    let mut require = |name: &str, value: &Option<String>| {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            errors.insert(name.to_string(), "This field is required".to_string());
        }
    };

    require("alertType", &req.alert_type);
    require("title", &req.title);
    require("description", &req.description);
    errors
}

/// Heuristic 0-10 risk score. Each jurisdiction contributes
/// `rejection_rate * 5`, plus 2 when its 30-day claim volume exceeds 100;
/// contributions are averaged weighted by claim count and clamped to
/// [0, 10].
pub fn risk_score(factors: &[RiskFactor]) -> f64 {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for factor in factors {
        if factor.claim_count <= 0 {
            continue;
        }
        let rejection_rate = factor.rejection_count as f64 / factor.claim_count as f64;
        let volume_penalty = if factor.claim_count > 100 { 2.0 } else { 0.0 };
        let contribution = rejection_rate * 5.0 + volume_penalty;
        let weight = factor.claim_count as f64;

        total_score += contribution * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        (total_score / total_weight).clamp(0.0, 10.0)
    } else {
        0.0
    }
}

/// Approved share of the window as a percentage, one decimal. Zero claims
/// yields 0, not an error.
pub fn approval_rate(approved: i64, total: i64) -> f64 {
    if total > 0 {
        round_to_tenth(approved as f64 / total as f64 * 100.0)
    } else {
        0.0
    }
}

/// Naive linear projection over the next six periods. Growth is the
/// difference between the last and first observed months divided by the
/// number of months; confidence decays 5 points per period with a floor
/// of 60.
pub fn forecast(trends: &[TrendPoint], now: DateTime<Utc>) -> Vec<ForecastPoint> {
    let last = match trends.last() {
        Some(last) => last,
        None => return vec![],
    };

    let avg_growth = if trends.len() > 1 {
        (last.submitted - trends[0].submitted) as f64 / trends.len() as f64
    } else {
        0.0
    };

    (1..=6u32)
        .map(|i| {
            let future = now.checked_add_months(Months::new(i)).unwrap_or(now);
            let quarter = (future.month() + 2) / 3;
            ForecastPoint {
                period: format!("Q{} {}", quarter, future.year()),
                predicted: ((last.submitted as f64 + avg_growth * i as f64).round() as i64).max(0),
                confidence: (95 - 5 * i as i64).max(60),
            }
        })
        .collect()
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn factor(state: &str, claims: i64, rejections: i64) -> RiskFactor {
        RiskFactor {
            state: state.to_string(),
            claim_count: claims,
            rejection_count: rejections,
        }
    }

    fn trend(month: &str, submitted: i64) -> TrendPoint {
        TrendPoint {
            month: month.to_string(),
            submitted,
            approved: 0,
            rejected: 0,
        }
    }

    #[test]
    fn risk_score_is_zero_without_jurisdictions() {
        assert_eq!(risk_score(&[]), 0.0);
    }

    #[test]
    fn single_jurisdiction_half_rejected() {
        // Two claims, one rejected: rate 0.5, contribution 0.5*5 = 2.5.
        let score = risk_score(&[factor("X", 2, 1)]);
        assert!((score - 2.5).abs() < 1e-9);
    }

    #[test]
    fn high_volume_jurisdiction_gets_penalty() {
        // 200 claims, none rejected: contribution is just the +2 penalty.
        let score = risk_score(&[factor("X", 200, 0)]);
        assert!((score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn risk_score_stays_within_bounds() {
        let inputs = vec![
            vec![factor("A", 1, 1)],
            vec![factor("A", 500, 500)],
            vec![factor("A", 101, 101), factor("B", 3, 0)],
            vec![factor("A", 7, 2), factor("B", 150, 149), factor("C", 1, 0)],
        ];
        for factors in inputs {
            let score = risk_score(&factors);
            assert!((0.0..=10.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn weighted_average_across_jurisdictions() {
        // A: 10 claims, rate 0.2 -> 1.0; B: 30 claims, rate 0.0 -> 0.0.
        // Weighted: (1.0*10 + 0.0*30) / 40 = 0.25.
        let score = risk_score(&[factor("A", 10, 2), factor("B", 30, 0)]);
        assert!((score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn approval_rate_zero_when_no_claims() {
        assert_eq!(approval_rate(0, 0), 0.0);
    }

    #[test]
    fn approval_rate_rounds_to_one_decimal() {
        assert_eq!(approval_rate(1, 3), 33.3);
        assert_eq!(approval_rate(2, 3), 66.7);
        assert_eq!(approval_rate(5, 5), 100.0);
    }

    #[test]
    fn forecast_of_two_month_trend() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let points = forecast(&[trend("2024-12", 100), trend("2025-01", 120)], now);

        assert_eq!(points.len(), 6);
        // Growth: (120 - 100) / 2 = 10 per period.
        assert_eq!(points[0].predicted, 130);
        assert_eq!(points[0].confidence, 90);
        assert_eq!(points[5].predicted, 180);
        assert_eq!(points[5].confidence, 65);
    }

    #[test]
    fn forecast_confidence_never_drops_below_floor() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let points = forecast(&[trend("2025-05", 50)], now);
        let mut prev = i64::MAX;
        for p in &points {
            assert!(p.confidence >= 60);
            assert!(p.confidence <= prev);
            prev = p.confidence;
        }
    }

    #[test]
    fn forecast_single_month_has_zero_growth() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let points = forecast(&[trend("2025-02", 40)], now);
        assert!(points.iter().all(|p| p.predicted == 40));
    }

    #[test]
    fn forecast_never_predicts_negative_volume() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let points = forecast(&[trend("2025-01", 60), trend("2025-02", 2)], now);
        assert!(points.iter().all(|p| p.predicted >= 0));
    }

    #[test]
    fn forecast_periods_carry_quarter_labels() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let points = forecast(&[trend("2025-01", 10)], now);
        // Feb 2025 -> Q1, Jul 2025 -> Q3.
        assert_eq!(points[0].period, "Q1 2025");
        assert_eq!(points[5].period, "Q3 2025");
    }

    #[test]
    fn forecast_empty_trend_is_empty() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(forecast(&[], now).is_empty());
    }
}
