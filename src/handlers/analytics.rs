use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::analytics_service::{AnalyticsService, CreateAlertRequest};

/// GET /api/analytics/dashboard - KPIs, trends, and forecast
pub async fn dashboard(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let service = AnalyticsService::new().await?;
    let dashboard = service.dashboard(&user).await?;

    Ok(Json(json!({
        "success": true,
        "data": dashboard
    })))
}

/// GET /api/analytics/alerts - active alerts, most severe first
pub async fn alerts(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let service = AnalyticsService::new().await?;
    let alerts = service.list_active_alerts(&user).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "alerts": alerts }
    })))
}

/// POST /api/analytics/alerts - admin-only alert creation
pub async fn create_alert(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = AnalyticsService::new().await?;
    let alert_id = service.create_alert(&user, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "message": "Alert created successfully",
                "alertId": alert_id
            }
        })),
    ))
}

/// PUT /api/analytics/alerts/:id/resolve
pub async fn resolve_alert(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = AnalyticsService::new().await?;
    service.resolve_alert(&user, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Alert resolved successfully" }
    })))
}
