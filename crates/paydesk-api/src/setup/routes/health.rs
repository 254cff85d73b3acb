//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness check - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "alive" })))
}

/// Readiness check - database reachable.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(pool) = state.db.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({ "status": "ready", "database": "skipped" })),
        );
    };

    let (ready, database) =
        match tokio::time::timeout(READINESS_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await
        {
            Ok(Ok(_)) => (true, "ready".to_string()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Database readiness check failed");
                (false, format!("not_ready: {}", e))
            }
            Err(_) => {
                tracing::error!("Database readiness check timed out");
                (false, "timeout".to_string())
            }
        };

    if ready {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "database": database })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "database": database })),
        )
    }
}
