use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod policy;
mod services;
mod types;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting FRA Atlas API in {:?} mode", config.environment);

    if let Err(e) = crate::database::manager::DatabaseManager::migrate().await {
        panic!("database migration failed: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("FRA_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🌳 FRA Atlas API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Protected API behind JWT validation
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router {
    Router::new()
        .merge(claim_routes())
        .merge(document_routes())
        .merge(analytics_routes())
        .merge(community_routes())
        .layer(axum::middleware::from_fn(
            crate::middleware::jwt_auth_middleware,
        ))
}

fn claim_routes() -> Router {
    use axum::routing::{post, put};
    use handlers::claims;

    Router::new()
        .route("/api/claims", get(claims::list).post(claims::submit))
        .route("/api/claims/stats/overview", get(claims::stats))
        .route("/api/claims/:id", get(claims::get_one))
        .route("/api/claims/:id/status", put(claims::update_status))
}

fn document_routes() -> Router {
    use axum::routing::{delete, post, put};
    use handlers::documents;

    Router::new()
        .route("/api/documents", post(documents::register))
        .route(
            "/api/documents/claim/:claim_id",
            get(documents::list_for_claim),
        )
        .route("/api/documents/:id/download", get(documents::download))
        .route("/api/documents/:id/verify", put(documents::verify))
        .route("/api/documents/:id", delete(documents::remove))
}

fn analytics_routes() -> Router {
    use axum::routing::put;
    use handlers::analytics;

    Router::new()
        .route("/api/analytics/dashboard", get(analytics::dashboard))
        .route(
            "/api/analytics/alerts",
            get(analytics::alerts).post(analytics::create_alert),
        )
        .route(
            "/api/analytics/alerts/:id/resolve",
            put(analytics::resolve_alert),
        )
}

fn community_routes() -> Router {
    use axum::routing::put;
    use handlers::community;

    Router::new()
        .route(
            "/api/community/feedback",
            get(community::own_feedback).post(community::submit_feedback),
        )
        .route("/api/community/feedback/all", get(community::all_feedback))
        .route(
            "/api/community/feedback/:id/status",
            put(community::feedback_status),
        )
        .route(
            "/api/community/notifications",
            get(community::notifications),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "FRA Atlas API",
            "version": version,
            "description": "Forest rights claim tracking and analytics API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "claims": "/api/claims[/:id] (protected)",
                "claim_status": "/api/claims/:id/status (protected - officer/admin)",
                "claim_stats": "/api/claims/stats/overview (protected - officer/admin)",
                "documents": "/api/documents[/:id] (protected)",
                "analytics": "/api/analytics/* (protected - officer/admin)",
                "community": "/api/community/* (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
