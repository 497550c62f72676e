//! Activity tracking and analytics endpoints

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::server::routes::engagement::{current_streak, session_days};
use crate::server::state::AppState;
use crate::types::activity::{DashboardSessionRequest, TrackActivityRequest};
use crate::types::UserActivity;

/// POST /api/dashboard/track
pub async fn track(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<TrackActivityRequest>,
) -> Result<(StatusCode, Json<UserActivity>)> {
    let activity = state.db().insert_activity(user.user_id, &request)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// POST /api/dashboard/sessions
pub async fn log_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<DashboardSessionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let session = state.db().insert_study_session(
        user.user_id,
        request.duration_minutes * 60,
        &request.subject,
        request.completed,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Session created", "id": session.id })),
    ))
}

/// GET /api/dashboard/user-dashboard
pub async fn user_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let progress = state.db().get_progress(user.user_id)?;
    let current_level = progress
        .as_ref()
        .and_then(|p| p.current_level.clone())
        .unwrap_or_else(|| "N/A".to_string());
    let completed_lessons = progress
        .as_ref()
        .map(|p| p.completed_lessons.len())
        .unwrap_or(0);

    let points = state
        .db()
        .get_score(user.user_id)?
        .map(|s| s.points)
        .unwrap_or(0);

    Ok(Json(json!({
        "user_id": user.user_id,
        "current_level": current_level,
        "completed_lessons": completed_lessons,
        "gamification_points": points,
        "flashcard_packs_owned": state.db().count_packs(user.user_id)?,
        "flashcards_owned": state.db().count_flashcards(user.user_id)?,
    })))
}

/// GET /api/dashboard/overview
pub async fn overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let pack_count = state.db().count_packs(user.user_id)?;
    let sessions = state.db().study_sessions(user.user_id, None)?;
    let completed_sessions = sessions.iter().filter(|s| s.completed).count() as i64;
    let message_count = state.db().count_messages_by_sender(user.user_id)?;
    let total_activities = state.db().count_activities(user.user_id)?;

    let engagement_score = engagement_score(total_activities, pack_count, completed_sessions);

    let today = Utc::now().date_naive();
    let activity_timestamps = state.db().activity_timestamps(user.user_id)?;
    let recent_activity: Vec<serde_json::Value> = (0..7)
        .rev()
        .map(|i| {
            let date = today - Duration::days(i);
            let count = activity_timestamps
                .iter()
                .filter(|ts| ts.date_naive() == date)
                .count();
            json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "activity_count": count,
            })
        })
        .collect();

    let time_spent_today_seconds: i64 = sessions
        .iter()
        .filter(|s| s.timestamp.date_naive() == today)
        .map(|s| s.duration)
        .sum();

    let days = session_days(&sessions);

    Ok(Json(json!({
        "total_courses": pack_count,
        "completed_courses": completed_sessions,
        "total_messages": message_count,
        "engagement_score": engagement_score,
        "recent_activity": recent_activity,
        "time_spent_today": (time_spent_today_seconds as f64 / 60.0).round() as i64,
        "streak_days": current_streak(&days, today),
    })))
}

/// GET /api/dashboard/stats
pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Json<serde_json::Value> {
    match collect_stats(&state, user.user_id) {
        Ok(stats) => Json(stats),
        Err(e) => {
            tracing::error!(error = %e, "Error getting stats");
            Json(json!({
                "total_flashcards": 0,
                "study_sessions": 0,
                "current_streak": 0,
                "total_study_time": 0,
                "recent_sessions": [],
            }))
        }
    }
}

fn collect_stats(state: &AppState, user_id: i64) -> Result<serde_json::Value> {
    let total_flashcards = state.db().count_flashcards(user_id)?;
    let sessions = state.db().study_sessions(user_id, None)?;
    let total_study_time: i64 = sessions.iter().map(|s| s.duration).sum();
    let days = session_days(&sessions);

    let recent_sessions: Vec<serde_json::Value> = sessions
        .iter()
        .take(5)
        .map(|s| {
            json!({
                "id": s.id,
                "date": s.timestamp.to_rfc3339(),
                "duration": s.duration / 60,
                "subject": s.subject,
                "completed": s.completed,
            })
        })
        .collect();

    Ok(json!({
        "total_flashcards": total_flashcards,
        "study_sessions": sessions.len(),
        "current_streak": current_streak(&days, Utc::now().date_naive()),
        "total_study_time": total_study_time,
        "recent_sessions": recent_sessions,
    }))
}

#[derive(Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_period")]
    period: String,
}

fn default_period() -> String {
    "week".to_string()
}

/// GET /api/dashboard/summary
pub async fn summary(_user: AuthUser, Query(params): Query<SummaryParams>) -> Json<serde_json::Value> {
    Json(json!({
        "period": params.period,
        "total_study_time": 320,
        "sessions_completed": 12,
        "average_session_length": 27,
        "most_studied_topic": "Mathematics",
        "performance_score": 85,
    }))
}

#[derive(Deserialize)]
pub struct ExportParams {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// GET /api/dashboard/reports/export
pub async fn export_report(
    _user: AuthUser,
    Query(params): Query<ExportParams>,
) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("Report exported in {} format", params.format),
        "download_url": "/api/insights/download/report.json",
    }))
}

/// Activity-weighted engagement score, capped at 100
fn engagement_score(activities: i64, packs: i64, completed_sessions: i64) -> i64 {
    (activities * 5 + packs * 10 + completed_sessions * 15).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_score_formula() {
        assert_eq!(engagement_score(0, 0, 0), 0);
        assert_eq!(engagement_score(2, 1, 1), 35);
        // Caps at 100
        assert_eq!(engagement_score(100, 100, 100), 100);
    }
}
