use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::analytics_service::AnalyticsService;
use crate::services::claim_service::{
    ClaimListFilter, ClaimService, SubmitClaimRequest, UpdateStatusRequest,
};
use crate::services::event_service::EventOrigin;

#[derive(Debug, Deserialize)]
pub struct ClaimListQuery {
    pub status: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/claims - paged listing, citizens scoped to their own claims
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ClaimListQuery>,
) -> Result<Json<Value>, ApiError> {
    let service = ClaimService::new().await?;
    let filter = ClaimListFilter {
        status: query.status,
        state: query.state,
        district: query.district,
    };
    let (claims, pagination) = service.list(&user, &filter, query.page, query.limit).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "claims": claims,
            "pagination": pagination
        }
    })))
}

/// GET /api/claims/:id - single claim with documents
pub async fn get_one(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = ClaimService::new().await?;
    let (claim, documents) = service.get(&user, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "claim": claim,
            "documents": documents
        }
    })))
}

/// POST /api/claims - submit a new claim
pub async fn submit(
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(payload): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = ClaimService::new().await?;
    let origin = EventOrigin::from_headers(&headers);
    let submitted = service.submit(&user, payload, &origin).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "message": "Claim submitted successfully",
                "claimId": submitted.claim_id,
                "claimNumber": submitted.claim_number
            }
        })),
    ))
}

/// PUT /api/claims/:id/status - officer/admin status transition
pub async fn update_status(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let service = ClaimService::new().await?;
    let origin = EventOrigin::from_headers(&headers);
    service.update_status(&user, id, payload, &origin).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Claim status updated successfully" }
    })))
}

/// GET /api/claims/stats/overview - 30-day breakdown plus 12-month trend
pub async fn stats(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let claims = ClaimService::new().await?;
    let overview = claims.stats_overview(&user).await?;

    let analytics = AnalyticsService::new().await?;
    let monthly_trends = analytics.monthly_trend().await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "overview": overview,
            "monthlyTrends": monthly_trends
        }
    })))
}
