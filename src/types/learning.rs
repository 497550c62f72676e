//! Flashcard, pack, and study session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flashcard pack row
#[derive(Debug, Clone, Serialize)]
pub struct FlashcardPack {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

/// A flashcard row
#[derive(Debug, Clone, Serialize)]
pub struct Flashcard {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub owner_id: i64,
    pub pack_id: Option<i64>,
    pub next_review: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

/// A study session row (duration in seconds)
#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub id: i64,
    pub user_id: i64,
    pub duration: i64,
    pub subject: String,
    pub completed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Pack with its cards, returned by GET /api/learning/packs/:id
#[derive(Debug, Clone, Serialize)]
pub struct PackDetail {
    #[serde(flatten)]
    pub pack: FlashcardPack,
    pub flashcards: Vec<Flashcard>,
}

/// POST /api/learning/packs
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/learning/flashcards
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFlashcardRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub pack_id: Option<i64>,
}

/// PUT /api/learning/flashcards/:id
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFlashcardRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// POST /api/learning/generate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// "textarea", "topic", or "document"
    pub method: String,
    pub pack_id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub document_text: Option<String>,
    #[serde(default = "default_num_cards")]
    pub num_cards: usize,
}

fn default_num_cards() -> usize {
    5
}

/// POST /api/learning/sessions
#[derive(Debug, Clone, Deserialize)]
pub struct LogSessionRequest {
    #[serde(default)]
    pub duration: i64,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_subject() -> String {
    "general".to_string()
}

fn default_completed() -> bool {
    true
}
