//! Development-only endpoints for mock data management
//!
//! Every handler refuses to run outside the development environment.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::error::{Error, Result};
use crate::seed::{MockDataManager, MOCK_PASSWORD};
use crate::server::state::AppState;

fn require_development(state: &AppState) -> Result<()> {
    if !state.config().is_development() {
        return Err(Error::Forbidden(
            "Only available in development mode".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/dev/seed-mock-data
pub async fn seed_mock_data(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    require_development(&state)?;

    let manager = MockDataManager::new(state.db().clone());
    let count = manager.seed_all().await?;
    let stats = manager.stats()?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Successfully seeded {} mock objects", count),
            "stats": stats,
        })),
    ))
}

/// DELETE /api/dev/flush-mock-data
pub async fn flush_mock_data(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    require_development(&state)?;

    let manager = MockDataManager::new(state.db().clone());
    let count = manager.flush_all()?;
    Ok(Json(json!({
        "message": format!("Successfully removed {} mock objects", count),
        "stats": manager.stats()?,
    })))
}

/// GET /api/dev/mock-data-stats
pub async fn mock_data_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    require_development(&state)?;

    let stats = MockDataManager::new(state.db().clone()).stats()?;
    Ok(Json(json!({
        "environment": "development",
        "total_objects": stats.total(),
        "mock_data_stats": stats,
    })))
}

/// POST /api/dev/reset-database
pub async fn reset_database(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    require_development(&state)?;

    let manager = MockDataManager::new(state.db().clone());
    let flushed = manager.flush_all()?;
    let seeded = manager.seed_all().await?;
    Ok(Json(json!({
        "message": "Database reset successfully",
        "flushed": flushed,
        "seeded": seeded,
        "stats": manager.stats()?,
    })))
}

/// GET /api/dev/test-users
pub async fn test_users(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    require_development(&state)?;

    Ok(Json(json!({
        "test_users": [
            { "username": "alice", "password": MOCK_PASSWORD, "role": "user" },
            { "username": "bob", "password": MOCK_PASSWORD, "role": "user" },
            { "username": "charlie", "password": MOCK_PASSWORD, "role": "admin" },
        ],
        "note": "Use these credentials for testing",
    })))
}
