//! Health and version endpoints

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::server::state::AppState;

const SERVICE_NAME: &str = "UltraLearning API";

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_status = match state.db().ping() {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            "unhealthy"
        }
    };

    Json(json!({
        "status": if db_status == "healthy" { "healthy" } else { "degraded" },
        "database": db_status,
        "environment": state.config().environment,
        "service": SERVICE_NAME,
    }))
}

/// GET /api/version
pub async fn version(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config().environment,
    }))
}
