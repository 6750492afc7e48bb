//! Append-only analytics event log. Recording an event never fails the
//! operation that produced it; insert errors are logged and swallowed.

use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

/// Request origin metadata captured alongside an event.
#[derive(Debug, Clone, Default)]
pub struct EventOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl EventOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        Self {
            // First hop of x-forwarded-for when behind a proxy.
            ip_address: header_str("x-forwarded-for")
                .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
                .filter(|s| !s.is_empty()),
            user_agent: header_str("user-agent"),
        }
    }
}

pub async fn record(
    pool: &PgPool,
    event_type: &str,
    event_data: serde_json::Value,
    user_id: Option<Uuid>,
    claim_id: Option<Uuid>,
    origin: &EventOrigin,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO analytics_events (id, event_type, event_data, user_id, claim_id, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_type)
    .bind(event_data)
    .bind(user_id)
    .bind(claim_id)
    .bind(&origin.ip_address)
    .bind(&origin.user_agent)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("failed to record {} event: {}", event_type, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("test-agent/1.0"));

        let origin = EventOrigin::from_headers(&headers);
        assert_eq!(origin.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(origin.user_agent.as_deref(), Some("test-agent/1.0"));
    }

    #[test]
    fn origin_tolerates_missing_headers() {
        let origin = EventOrigin::from_headers(&HeaderMap::new());
        assert!(origin.ip_address.is_none());
        assert!(origin.user_agent.is_none());
    }
}
