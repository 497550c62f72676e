//! Flashcard pack, generation, and study session endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::agents::GeneratedCard;
use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::learning::{
    CreateFlashcardRequest, CreatePackRequest, GenerateRequest, LogSessionRequest, PackDetail,
    UpdateFlashcardRequest,
};
use crate::types::{Flashcard, FlashcardPack, StudySession};

/// Document text beyond this length is truncated before generation
const DOCUMENT_CONTENT_LIMIT: usize = 2000;

const RECENT_SESSION_LIMIT: usize = 10;

/// POST /api/learning/packs
pub async fn create_pack(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePackRequest>,
) -> Result<(StatusCode, Json<FlashcardPack>)> {
    if request.title.trim().is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    let pack = state
        .db()
        .create_pack(&request.title, request.description.as_deref(), user.user_id)?;
    Ok((StatusCode::CREATED, Json(pack)))
}

/// GET /api/learning/packs
pub async fn list_packs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FlashcardPack>>> {
    Ok(Json(state.db().list_packs(user.user_id)?))
}

/// GET /api/learning/packs/:id
pub async fn get_pack(
    State(state): State<AppState>,
    user: AuthUser,
    Path(pack_id): Path<i64>,
) -> Result<Json<PackDetail>> {
    let pack = state
        .db()
        .get_pack(pack_id, user.user_id)?
        .ok_or_else(|| Error::NotFound("Pack not found".to_string()))?;
    let flashcards = state.db().flashcards_in_pack(pack.id)?;
    Ok(Json(PackDetail { pack, flashcards }))
}

/// POST /api/learning/flashcards
pub async fn create_flashcard(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateFlashcardRequest>,
) -> Result<(StatusCode, Json<Flashcard>)> {
    if request.question.trim().is_empty() || request.answer.trim().is_empty() {
        return Err(Error::Validation(
            "Question and answer are required".to_string(),
        ));
    }
    if let Some(pack_id) = request.pack_id {
        if state.db().get_pack(pack_id, user.user_id)?.is_none() {
            return Err(Error::NotFound("Pack not found".to_string()));
        }
    }
    let card = state.db().create_flashcard(
        &request.question,
        &request.answer,
        user.user_id,
        request.pack_id,
    )?;
    Ok((StatusCode::CREATED, Json(card)))
}

#[derive(Deserialize)]
pub struct FlashcardFilter {
    #[serde(default)]
    pub pack_id: Option<i64>,
}

/// GET /api/learning/flashcards
pub async fn list_flashcards(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<FlashcardFilter>,
) -> Result<Json<Vec<Flashcard>>> {
    Ok(Json(
        state.db().flashcards_for_owner(user.user_id, filter.pack_id)?,
    ))
}

/// PUT /api/learning/flashcards/:id
pub async fn update_flashcard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(card_id): Path<i64>,
    Json(request): Json<UpdateFlashcardRequest>,
) -> Result<Json<Flashcard>> {
    let updated = state
        .db()
        .update_flashcard(
            card_id,
            user.user_id,
            request.question.as_deref(),
            request.answer.as_deref(),
        )?
        .ok_or_else(|| Error::NotFound("Flashcard not found".to_string()))?;
    Ok(Json(updated))
}

/// DELETE /api/learning/flashcards/:id
pub async fn delete_flashcard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(card_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if !state.db().delete_flashcard(card_id, user.user_id)? {
        return Err(Error::NotFound("Flashcard not found".to_string()));
    }
    Ok(Json(json!({ "message": "Flashcard deleted successfully" })))
}

/// POST /api/learning/generate
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>> {
    let pack = state
        .db()
        .get_pack(request.pack_id, user.user_id)?
        .ok_or_else(|| Error::NotFound("Pack not found".to_string()))?;

    let supervisor = state.supervisor();
    let mut cards: Vec<GeneratedCard> = Vec::new();

    match request.method.as_str() {
        "textarea" => {
            let content = request
                .content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| {
                    Error::Validation("Content is required for textarea method".to_string())
                })?;
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                // "Question | Answer" lines are taken verbatim; plain
                // lines get a single generated card each
                if let Some((q, a)) = line.split_once('|') {
                    cards.push(GeneratedCard {
                        question: q.trim().to_string(),
                        answer: a.trim().to_string(),
                    });
                } else {
                    let prompt = format!("Create a flashcard about: {}", line);
                    cards.extend(
                        supervisor
                            .generate_flashcards(Some(user.user_id), &prompt, 1)
                            .await,
                    );
                }
            }
        }
        "topic" => {
            let topic = request
                .topic
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| {
                    Error::Validation("Topic is required for topic method".to_string())
                })?;
            tracing::info!(topic, num_cards = request.num_cards, "Generating flashcards");
            cards = supervisor
                .generate_flashcards(Some(user.user_id), topic, request.num_cards)
                .await;
        }
        "document" => {
            let document_text = request
                .document_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| {
                    Error::Validation("document_text is required for document method".to_string())
                })?;
            let snippet: String = document_text.chars().take(DOCUMENT_CONTENT_LIMIT).collect();
            let prompt = format!("Create flashcards from this content: {}", snippet);
            cards = supervisor
                .generate_flashcards(Some(user.user_id), &prompt, request.num_cards)
                .await;
        }
        _ => {
            return Err(Error::Validation(
                "Invalid method. Use: textarea, topic, or document".to_string(),
            ));
        }
    }

    let pairs: Vec<(String, String)> = cards
        .iter()
        .map(|c| (c.question.clone(), c.answer.clone()))
        .collect();
    let created = state.db().insert_flashcards(&pairs, user.user_id, pack.id)?;

    Ok(Json(json!({
        "method": request.method,
        "created_flashcards_count": created.len(),
        "pack_id": pack.id,
        "flashcards": created,
    })))
}

/// POST /api/learning/sessions
pub async fn log_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<LogSessionRequest>,
) -> Result<(StatusCode, Json<StudySession>)> {
    let session = state.db().insert_study_session(
        user.user_id,
        request.duration,
        &request.subject,
        request.completed,
    )?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/learning/sessions
pub async fn recent_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<StudySession>>> {
    Ok(Json(
        state.db().study_sessions(user.user_id, Some(RECENT_SESSION_LIMIT))?,
    ))
}

/// GET /api/learning/recommendations
pub async fn recommendations(_user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({
        "recommendations": [
            { "topic": "Review flashcards", "priority": "high" },
            { "topic": "Practice quiz", "priority": "medium" },
        ]
    }))
}
