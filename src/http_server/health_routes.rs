//! Health & Diagnostics HTTP Routes
//!
//! The service stays up even when the database is unreachable; these
//! endpoints are what keeps that state observable.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::Row;

use super::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub environment: String,
    pub database: DatabaseHealth,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub message: String,
}

/// Create health and diagnostics routes (nested under /api)
pub fn health_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/diagnostics", get(diagnostics_handler))
        .with_state(state)
}

/// Plain-text liveness probe at the root
pub fn root_routes() -> Router {
    Router::new().route("/", get(root_handler))
}

async fn root_handler() -> &'static str {
    "sqlbridge is running"
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.manager.check_health().await;
    let response = HealthResponse {
        status: if health.connected { "ok" } else { "degraded" }.to_string(),
        message: if health.connected {
            "service healthy".to_string()
        } else {
            "database unreachable".to_string()
        },
        environment: state.config.environment.clone(),
        database: DatabaseHealth {
            connected: health.connected,
            message: health.detail,
        },
        timestamp: Utc::now().to_rfc3339(),
    };

    Json(response)
}

async fn diagnostics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.manager.check_health().await;
    let pool_initialized = state.manager.current().await.is_some();

    let mut body = json!({
        "environment": state.config.environment,
        "db_config": state.config.db.masked(),
        "pool_initialized": pool_initialized,
        "connection_test": health.connected,
    });

    if health.connected {
        if let Some(tables) = list_tables(&state).await {
            body["tables"] = Value::Array(tables.into_iter().map(Value::String).collect());
        }
    }

    Json(body)
}

/// Table names in the public schema; best-effort, omitted on failure
async fn list_tables(state: &AppState) -> Option<Vec<String>> {
    let pool = state.manager.current().await?;
    let rows = sqlx::query(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .ok()?;

    Some(
        rows.iter()
            .filter_map(|row| row.try_get::<String, _>(0).ok())
            .collect(),
    )
}
