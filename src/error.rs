// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::policy::PolicyError;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Taxonomy: validation failures carry field-level detail; authorization
/// failures are surfaced as a generic denial; persistence constraint
/// violations are surfaced as a generic 400 without internal detail; anything
/// unexpected is logged and surfaced generically (full detail only in
/// development).
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "success": false,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            ApiError::InternalServerError(detail) => {
                let mut response = json!({
                    "success": false,
                    "message": "An unexpected error occurred",
                    "code": "INTERNAL_SERVER_ERROR"
                });

                // Internals stay hidden outside development.
                if crate::config::config().is_development() {
                    response["detail"] = json!(detail);
                }

                response
            }
            _ => {
                json!({
                    "success": false,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<PolicyError> for ApiError {
    fn from(_: PolicyError) -> Self {
        // Generic denial: never explain why, and never confirm the record exists.
        ApiError::forbidden("Access denied")
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => ApiError::from(sqlx_err),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
            sqlx::Error::Database(db) if is_constraint_violation(db.code().as_deref()) => {
                // Constraint violations surface as a generic 400-equivalent.
                tracing::warn!("constraint violation: {}", db.message());
                ApiError::bad_request("Request could not be processed")
            }
            _ => {
                tracing::error!("database error: {}", err);
                ApiError::internal_server_error(err.to_string())
            }
        }
    }
}

// 23505 = unique_violation, 23503 = foreign_key_violation
fn is_constraint_violation(code: Option<&str>) -> bool {
    matches!(code, Some("23505") | Some("23503"))
}

impl From<crate::services::claim_service::ClaimError> for ApiError {
    fn from(err: crate::services::claim_service::ClaimError) -> Self {
        use crate::services::claim_service::ClaimError;
        match err {
            ClaimError::Validation(field_errors) => {
                ApiError::validation_error("Missing required fields", Some(field_errors))
            }
            ClaimError::NotFound => ApiError::not_found("Claim not found"),
            ClaimError::ClaimNumberExhausted => {
                tracing::error!("claim number generation exhausted retries");
                ApiError::conflict("Could not allocate a claim number, please retry")
            }
            ClaimError::Policy(e) => e.into(),
            ClaimError::Database(e) => e.into(),
            ClaimError::Sqlx(e) => e.into(),
        }
    }
}

impl From<crate::services::document_service::DocumentError> for ApiError {
    fn from(err: crate::services::document_service::DocumentError) -> Self {
        use crate::services::document_service::DocumentError;
        match err {
            DocumentError::Validation(field_errors) => {
                ApiError::validation_error("Missing required fields", Some(field_errors))
            }
            DocumentError::ClaimNotFound => ApiError::not_found("Claim not found"),
            DocumentError::NotFound => ApiError::not_found("Document not found"),
            DocumentError::FileMissing => ApiError::not_found("File not found on server"),
            DocumentError::Policy(e) => e.into(),
            DocumentError::Database(e) => e.into(),
            DocumentError::Sqlx(e) => e.into(),
        }
    }
}

impl From<crate::services::analytics_service::AnalyticsError> for ApiError {
    fn from(err: crate::services::analytics_service::AnalyticsError) -> Self {
        use crate::services::analytics_service::AnalyticsError;
        match err {
            AnalyticsError::Validation(field_errors) => {
                ApiError::validation_error("Missing required fields", Some(field_errors))
            }
            AnalyticsError::AlertNotFound => ApiError::not_found("Alert not found"),
            AnalyticsError::Policy(e) => e.into(),
            AnalyticsError::Database(e) => e.into(),
            AnalyticsError::Sqlx(e) => e.into(),
        }
    }
}

impl From<crate::services::community_service::CommunityError> for ApiError {
    fn from(err: crate::services::community_service::CommunityError) -> Self {
        use crate::services::community_service::CommunityError;
        match err {
            CommunityError::Validation(field_errors) => ApiError::validation_error(
                "Feedback type, subject, and message are required",
                Some(field_errors),
            ),
            CommunityError::NotFound => ApiError::not_found("Feedback not found"),
            CommunityError::Policy(e) => e.into(),
            CommunityError::Database(e) => e.into(),
            CommunityError::Sqlx(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_denial_is_generic() {
        let err = ApiError::from(PolicyError::AccessDenied);
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "Access denied");
    }

    #[test]
    fn unique_violation_detection() {
        assert!(is_constraint_violation(Some("23505")));
        assert!(is_constraint_violation(Some("23503")));
        assert!(!is_constraint_violation(Some("42601")));
        assert!(!is_constraint_violation(None));
    }

    #[test]
    fn validation_error_carries_field_detail() {
        let mut fields = HashMap::new();
        fields.insert("state".to_string(), "This field is required".to_string());
        let err = ApiError::validation_error("Missing required fields", Some(fields));
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["state"], "This field is required");
    }
}
