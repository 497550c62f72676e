//! Activity tracking and LLM query log types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked frontend activity (page view, button click, ...)
#[derive(Debug, Clone, Serialize)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: String,
    pub page_url: Option<String>,
    pub element_id: Option<String>,
    pub extra_data: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/dashboard/track
#[derive(Debug, Clone, Deserialize)]
pub struct TrackActivityRequest {
    pub activity_type: String,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub element_id: Option<String>,
    #[serde(default, rename = "metadata")]
    pub extra_data: Option<serde_json::Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /api/dashboard/sessions
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSessionRequest {
    #[serde(default = "default_dashboard_subject")]
    pub subject: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default = "default_true")]
    pub completed: bool,
}

fn default_dashboard_subject() -> String {
    "Flashcards".to_string()
}

fn default_true() -> bool {
    true
}

/// A logged LLM call
#[derive(Debug, Clone)]
pub struct LlmQueryLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub prompt: String,
    pub response: Option<String>,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
