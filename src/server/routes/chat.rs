//! Chat room and message endpoints, including the RAG-assisted bot reply

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::chat::{CreateRoomRequest, NewMessage, PostMessageRequest, SendMessageRequest};
use crate::types::{ChatMessage, ChatRoom};

/// Number of recent messages folded into the conversation context
const CONTEXT_MESSAGE_LIMIT: usize = 20;

const NO_RAG_CONTEXT: &str = "No additional context available.";
const EMPTY_REPLY_FALLBACK: &str =
    "I'm here to help you with your learning journey and questions.";

/// POST /api/chat/rooms
pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<ChatRoom>)> {
    request.validate()?;

    if state.db().get_room_by_name(&request.name)?.is_some() {
        return Err(Error::Conflict("Room already exists.".to_string()));
    }

    let room = state.db().create_room(
        &request.name,
        &request.description,
        request.is_private,
        Some(user.user_id),
    )?;
    state.db().add_participant(room.id, user.user_id)?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /api/chat/rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<ChatRoom>>> {
    Ok(Json(state.db().list_rooms()?))
}

/// POST /api/chat/rooms/:id/participants
pub async fn join_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    if state.db().get_room(room_id)?.is_none() {
        return Err(Error::NotFound("Room not found.".to_string()));
    }
    if state.db().is_participant(room_id, user.user_id)? {
        return Err(Error::Conflict("Already a participant.".to_string()));
    }
    state.db().add_participant(room_id, user.user_id)?;
    Ok(Json(json!({ "msg": "Joined room successfully." })))
}

/// POST /api/chat/rooms/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i64>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    request.validate()?;
    if state.db().get_room(room_id)?.is_none() {
        return Err(Error::NotFound("Room not found.".to_string()));
    }

    let message = state.db().insert_message(&NewMessage {
        room_id,
        sender_id: user.user_id,
        content: request.content,
        role: request.role,
        is_ai: request.is_ai,
        message_type: request.message_type,
        status: request.status,
    })?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/chat/rooms/:id/messages
pub async fn room_messages(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.db().messages_for_room(room_id)?))
}

/// POST /api/chat/rooms/:id/post_message
///
/// The full chat flow: persist the user message, assemble conversation and
/// retrieval context, run the supervisor agent, persist the bot reply, and
/// return it with the whole room history.
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i64>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<serde_json::Value>> {
    if !matches!(request.role.as_str(), "user" | "advisor" | "admin") {
        return Err(Error::Validation("Invalid role".to_string()));
    }
    if request.content.trim().is_empty() {
        return Err(Error::Validation("Message content is required".to_string()));
    }
    if state.db().get_room(room_id)?.is_none() {
        return Err(Error::NotFound("Chat room not found".to_string()));
    }

    state.db().insert_message(&NewMessage::text(
        room_id,
        user.user_id,
        request.content.clone(),
        request.role.clone(),
    ))?;

    let recent = state.db().recent_messages(room_id, CONTEXT_MESSAGE_LIMIT)?;
    let conversation_context = build_conversation_context(&recent);

    let rag_context = match state.retriever().fetch_context(&request.content).await {
        Ok(context) if !context.is_empty() => context,
        Ok(_) => NO_RAG_CONTEXT.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "RAG retrieval failed");
            NO_RAG_CONTEXT.to_string()
        }
    };

    let combined_context = format!(
        "{}\n\nRelevant Documents:\n{}",
        conversation_context, rag_context
    );

    let mut bot_reply = state
        .supervisor()
        .respond(Some(user.user_id), &request.content, &combined_context)
        .await;
    if bot_reply.trim().is_empty() {
        bot_reply = EMPTY_REPLY_FALLBACK.to_string();
    }

    let assistant = state.learning_assistant().await?;
    if let Err(e) = state.db().insert_message(&NewMessage::text(
        room_id,
        assistant.id,
        bot_reply.clone(),
        "assistant".to_string(),
    )) {
        tracing::error!(error = %e, "Failed to save bot message");
    }

    let conversation = state.db().messages_for_room(room_id)?;
    Ok(Json(json!({
        "bot_reply": bot_reply,
        "conversation": conversation,
    })))
}

/// Group recent messages per role into one context block
fn build_conversation_context(messages: &[ChatMessage]) -> String {
    let mut blocks = Vec::new();
    for role in ["user", "advisor", "admin", "assistant"] {
        let joined = messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if !joined.is_empty() {
            blocks.push(format!("{} messages:\n{}", role, joined));
        }
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: 0,
            room_id: 1,
            sender_id: 1,
            content: content.to_string(),
            role: role.to_string(),
            is_ai: false,
            message_type: "text".to_string(),
            status: "sent".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_context_groups_by_role() {
        let messages = vec![
            message("user", "hello"),
            message("assistant", "hi there"),
            message("user", "explain rust"),
        ];
        let context = build_conversation_context(&messages);
        assert!(context.contains("user messages:\nhello\nexplain rust"));
        assert!(context.contains("assistant messages:\nhi there"));
        // No advisor/admin block when those roles are absent
        assert!(!context.contains("advisor messages"));
    }

    #[test]
    fn test_context_empty_when_no_messages() {
        assert!(build_conversation_context(&[]).is_empty());
    }
}
