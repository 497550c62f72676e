//! Gamification, progress, notification, and streak endpoints

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::storage::LeaderboardEntry;
use crate::types::engagement::{AddPointsRequest, UpdateProgressRequest};
use crate::types::{Badge, Notification, Progress, Score, StudySession};

const STREAK_GOAL: u32 = 30;
const LEADERBOARD_LIMIT: usize = 10;

/// GET /api/engagement/score
pub async fn score(State(state): State<AppState>, user: AuthUser) -> Result<Json<Score>> {
    Ok(Json(state.db().get_or_create_score(user.user_id)?))
}

/// POST /api/engagement/add-points
pub async fn add_points(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddPointsRequest>,
) -> Result<Json<Score>> {
    Ok(Json(state.db().add_points(user.user_id, request.points)?))
}

/// GET /api/engagement/badges (public)
pub async fn badges(State(state): State<AppState>) -> Result<Json<Vec<Badge>>> {
    Ok(Json(state.db().list_badges()?))
}

/// GET /api/engagement/progress
pub async fn progress(State(state): State<AppState>, user: AuthUser) -> Result<Json<Progress>> {
    let progress = state
        .db()
        .get_progress(user.user_id)?
        .ok_or_else(|| Error::NotFound("No progress found".to_string()))?;
    Ok(Json(progress))
}

/// POST /api/engagement/progress
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProgressRequest>,
) -> Result<Json<Progress>> {
    let progress = state.db().upsert_progress(
        user.user_id,
        request.current_level.as_deref(),
        request.completed_lessons.as_deref(),
    )?;
    Ok(Json(progress))
}

/// GET /api/engagement/notifications
pub async fn notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.db().notifications_for_user(user.user_id)?))
}

/// POST /api/engagement/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(notification_id): Path<i64>,
) -> Result<Json<Notification>> {
    let notification = state
        .db()
        .mark_notification_read(notification_id)?
        .ok_or_else(|| Error::NotFound("Notification not found".to_string()))?;
    Ok(Json(notification))
}

/// GET /api/engagement/streak
pub async fn streak(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let days = session_days(&state.db().study_sessions(user.user_id, None)?);
    let today = Utc::now().date_naive();
    Ok(Json(json!({
        "current_streak": current_streak(&days, today),
        "longest_streak": longest_streak(&days),
        "streak_goal": STREAK_GOAL,
    })))
}

/// GET /api/engagement/achievements
pub async fn achievements(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let earned: Vec<serde_json::Value> = state
        .db()
        .badges_for_user(user.user_id)?
        .iter()
        .map(|ub| {
            json!({
                "name": ub.badge.name,
                "earned": true,
                "earned_at": ub.awarded_at,
            })
        })
        .collect();
    Ok(Json(json!({ "achievements": earned })))
}

/// GET /api/engagement/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let entries: Vec<LeaderboardEntry> = state.db().leaderboard(LEADERBOARD_LIMIT)?;
    Ok(Json(json!({ "leaderboard": entries })))
}

/// GET /api/engagement/overview
pub async fn overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let score = state.db().get_or_create_score(user.user_id)?;
    let sessions = state.db().study_sessions(user.user_id, None)?;
    let days = session_days(&sessions);
    let today = Utc::now().date_naive();

    let time_spent_today: i64 = sessions
        .iter()
        .filter(|s| s.timestamp.date_naive() == today)
        .map(|s| s.duration / 60)
        .sum();

    let achievements: Vec<serde_json::Value> = state
        .db()
        .badges_for_user(user.user_id)?
        .iter()
        .rev()
        .take(5)
        .map(|ub| {
            json!({
                "id": ub.badge.id,
                "title": ub.badge.name,
                "description": ub.badge.description,
                "earned_at": ub.awarded_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "total_points": score.points,
        "streak_days": current_streak(&days, today),
        "time_spent_today": time_spent_today,
        "weekly_activity": weekly_activity(&sessions, today),
        "category_breakdown": category_breakdown(&sessions),
        "achievements": achievements,
    })))
}

/// Calendar days with at least one session
pub(crate) fn session_days(sessions: &[StudySession]) -> HashSet<NaiveDate> {
    sessions.iter().map(|s| s.timestamp.date_naive()).collect()
}

/// Consecutive days with a session, ending today
pub(crate) fn current_streak(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive session days anywhere in the history
pub(crate) fn longest_streak(days: &HashSet<NaiveDate>) -> u32 {
    let mut sorted: Vec<NaiveDate> = days.iter().copied().collect();
    sorted.sort();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in sorted {
        run = match prev.and_then(|p| p.succ_opt()) {
            Some(next) if next == day => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}

/// Minutes studied per weekday over the trailing 7 days, Mon..Sun
fn weekly_activity(sessions: &[StudySession], today: NaiveDate) -> Vec<serde_json::Value> {
    const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let mut per_weekday = [0i64; 7];
    for session in sessions {
        let date = session.timestamp.date_naive();
        let age = (today - date).num_days();
        if (0..7).contains(&age) {
            per_weekday[date.weekday().num_days_from_monday() as usize] += session.duration / 60;
        }
    }
    DAY_LABELS
        .iter()
        .zip(per_weekday.iter())
        .map(|(day, points)| json!({ "day": day, "points": points }))
        .collect()
}

/// Minutes studied per subject, across the whole history
fn category_breakdown(sessions: &[StudySession]) -> Vec<serde_json::Value> {
    let mut per_subject: BTreeMap<&str, i64> = BTreeMap::new();
    for session in sessions {
        *per_subject.entry(session.subject.as_str()).or_default() += session.duration / 60;
    }
    per_subject
        .into_iter()
        .map(|(category, points)| json!({ "category": category, "points": points }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_streak_ends_today() {
        let days: HashSet<NaiveDate> = [
            date(2026, 8, 26),
            date(2026, 8, 27),
            date(2026, 8, 28),
        ]
        .into_iter()
        .collect();
        assert_eq!(current_streak(&days, date(2026, 8, 28)), 3);
        // A gap yesterday means no current streak
        assert_eq!(current_streak(&days, date(2026, 8, 30)), 0);
    }

    #[test]
    fn test_current_streak_empty() {
        assert_eq!(current_streak(&HashSet::new(), date(2026, 8, 28)), 0);
    }

    #[test]
    fn test_longest_streak_with_gap() {
        let days: HashSet<NaiveDate> = [
            date(2026, 8, 1),
            date(2026, 8, 2),
            date(2026, 8, 3),
            date(2026, 8, 10),
            date(2026, 8, 11),
        ]
        .into_iter()
        .collect();
        assert_eq!(longest_streak(&days), 3);
    }

    #[test]
    fn test_longest_streak_single_day() {
        let days: HashSet<NaiveDate> = [date(2026, 8, 1)].into_iter().collect();
        assert_eq!(longest_streak(&days), 1);
        assert_eq!(longest_streak(&HashSet::new()), 0);
    }
}
