//! Chat room, message, and participant types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed message roles
pub const MESSAGE_ROLES: &[&str] = &["user", "advisor", "assistant", "admin"];

/// Allowed message types
pub const MESSAGE_TYPES: &[&str] = &["text", "transaction", "alert", "chart", "system"];

/// A chat room row
#[derive(Debug, Clone, Serialize)]
pub struct ChatRoom {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A chat message row
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub role: String,
    pub is_ai: bool,
    pub message_type: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Room membership row
#[derive(Debug, Clone, Serialize)]
pub struct ChatParticipant {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}

/// POST /api/chat/rooms
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
}

impl CreateRoomRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Room name is required".to_string()));
        }
        Ok(())
    }
}

/// POST /api/chat/rooms/:id/messages
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub is_ai: bool,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_message_type() -> String {
    "text".to_string()
}

fn default_status() -> String {
    "sent".to_string()
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation("Message content is required".to_string()));
        }
        if !MESSAGE_ROLES.contains(&self.role.as_str()) {
            return Err(Error::Validation(format!("Invalid role: {}", self.role)));
        }
        if !MESSAGE_TYPES.contains(&self.message_type.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid message type: {}",
                self.message_type
            )));
        }
        Ok(())
    }
}

/// POST /api/chat/rooms/:id/post_message, a message that triggers a bot reply
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
    pub role: String,
}

/// Fields for inserting a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub role: String,
    pub is_ai: bool,
    pub message_type: String,
    pub status: String,
}

impl NewMessage {
    /// A plain text message with default type/status
    pub fn text(room_id: i64, sender_id: i64, content: String, role: String) -> Self {
        Self {
            room_id,
            sender_id,
            content,
            role,
            is_ai: false,
            message_type: "text".to_string(),
            status: "sent".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_validation() {
        let msg = SendMessageRequest {
            content: "hello".to_string(),
            role: "user".to_string(),
            is_ai: false,
            message_type: "text".to_string(),
            status: "sent".to_string(),
        };
        assert!(msg.validate().is_ok());

        let bad_role = SendMessageRequest {
            role: "hacker".to_string(),
            ..msg.clone()
        };
        assert!(bad_role.validate().is_err());

        let bad_type = SendMessageRequest {
            message_type: "video".to_string(),
            ..msg
        };
        assert!(bad_type.validate().is_err());
    }
}
