//! Gamification, progress, and notification types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points total for a user
#[derive(Debug, Clone, Serialize)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
}

/// An earnable badge
#[derive(Debug, Clone, Serialize)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
}

/// A badge awarded to a user
#[derive(Debug, Clone, Serialize)]
pub struct UserBadge {
    pub id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub awarded_at: DateTime<Utc>,
    pub badge: Badge,
}

/// Learning progress for a user
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub current_level: Option<String>,
    pub completed_lessons: Vec<i64>,
    pub last_updated: DateTime<Utc>,
}

/// A user notification
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub notify_at: Option<DateTime<Utc>>,
}

/// POST /api/engagement/add-points
#[derive(Debug, Clone, Deserialize)]
pub struct AddPointsRequest {
    #[serde(default)]
    pub points: i64,
}

/// POST /api/engagement/progress
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProgressRequest {
    #[serde(default)]
    pub current_level: Option<String>,
    #[serde(default)]
    pub completed_lessons: Option<Vec<i64>>,
}
