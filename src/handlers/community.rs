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
use crate::services::community_service::{
    CommunityService, FeedbackListFilter, SubmitFeedbackRequest, UpdateFeedbackStatusRequest,
};
use crate::services::event_service::EventOrigin;

#[derive(Debug, Deserialize)]
pub struct FeedbackListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/community/feedback
pub async fn submit_feedback(
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = CommunityService::new().await?;
    let origin = EventOrigin::from_headers(&headers);
    let feedback_id = service.submit_feedback(&user, payload, &origin).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "message": "Feedback submitted successfully",
                "feedbackId": feedback_id
            }
        })),
    ))
}

/// GET /api/community/feedback - the requester's own feedback
pub async fn own_feedback(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let service = CommunityService::new().await?;
    let feedback = service.list_own_feedback(&user).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "feedback": feedback }
    })))
}

/// GET /api/community/feedback/all - officer/admin view across users
pub async fn all_feedback(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<FeedbackListQuery>,
) -> Result<Json<Value>, ApiError> {
    let service = CommunityService::new().await?;
    let filter = FeedbackListFilter {
        status: query.status,
        priority: query.priority,
    };
    let (feedback, pagination) = service
        .list_all_feedback(&user, &filter, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "feedback": feedback,
            "pagination": pagination
        }
    })))
}

/// PUT /api/community/feedback/:id/status - officer/admin resolution
pub async fn feedback_status(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFeedbackStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let service = CommunityService::new().await?;
    service.update_feedback_status(&user, id, payload).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Feedback status updated successfully" }
    })))
}

/// GET /api/community/notifications - merged feed over own records
pub async fn notifications(Extension(user): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let service = CommunityService::new().await?;
    let notifications = service.notifications(&user).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "notifications": notifications }
    })))
}
