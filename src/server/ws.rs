//! WebSocket chat endpoint
//!
//! Clients connect to `/ws/chat?token=<access token>` and exchange JSON
//! frames. Inbound actions are `join`, `leave`, and `message`; outbound
//! frames are `status` (join/leave notices), `receive_message`, and `error`.
//! Fanout per room goes through a broadcast channel held in app state, so
//! every connected member of a room sees every message.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

use crate::auth::TokenKind;
use crate::error::Error;
use crate::server::state::AppState;
use crate::types::chat::NewMessage;

#[derive(Deserialize)]
pub struct WsParams {
    token: String,
}

/// Inbound frame from a client
#[derive(Deserialize)]
struct ClientFrame {
    action: String,
    room: Option<i64>,
    content: Option<String>,
}

/// GET /ws/chat
pub async fn ws_chat(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let claims = state.auth().verify(&params.token, TokenKind::Access)?;
    let user_id = claims.user_id()?;
    let username = state
        .db()
        .get_user(user_id)?
        .map(|u| u.username)
        .ok_or_else(|| Error::Unauthorized("Unknown user".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, username)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i64, username: String) {
    let (mut sink, mut stream) = socket.split();

    // All outbound frames funnel through one mpsc so room-forwarder tasks
    // and direct replies share the sink
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // room id -> forwarder task piping that room's broadcasts to this client
    let mut joined: HashMap<i64, tokio::task::JoinHandle<()>> = HashMap::new();

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(_) => {
                send_error(&tx, "Malformed frame").await;
                continue;
            }
        };

        match frame.action.as_str() {
            "join" => {
                let Some(room_id) = frame.room else {
                    send_error(&tx, "Missing room").await;
                    continue;
                };
                if joined.contains_key(&room_id) {
                    continue;
                }
                let channel = state.room_channel(room_id);
                joined.insert(
                    room_id,
                    tokio::spawn(forward_room_frames(channel.subscribe(), tx.clone())),
                );
                broadcast(
                    &state,
                    room_id,
                    json!({
                        "event": "status",
                        "room": room_id,
                        "msg": format!("{} has joined room {}.", username, room_id),
                    }),
                );
            }
            "leave" => {
                let Some(room_id) = frame.room else {
                    send_error(&tx, "Missing room").await;
                    continue;
                };
                if let Some(task) = joined.remove(&room_id) {
                    task.abort();
                    let _ = task.await;
                    broadcast(
                        &state,
                        room_id,
                        json!({
                            "event": "status",
                            "room": room_id,
                            "msg": format!("{} has left room {}.", username, room_id),
                        }),
                    );
                    state.prune_room_channel(room_id);
                }
            }
            "message" => {
                let (Some(room_id), Some(content)) = (frame.room, frame.content) else {
                    send_error(&tx, "Missing data for message!").await;
                    continue;
                };
                if content.is_empty() {
                    send_error(&tx, "Missing data for message!").await;
                    continue;
                }
                let new_message =
                    NewMessage::text(room_id, user_id, content, "user".to_string());
                match state.db().insert_message(&new_message) {
                    Ok(saved) => broadcast(
                        &state,
                        room_id,
                        json!({
                            "event": "receive_message",
                            "room": room_id,
                            "sender_id": saved.sender_id,
                            "content": saved.content,
                            "timestamp": saved.timestamp.to_rfc3339(),
                        }),
                    ),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to persist chat message");
                        send_error(&tx, "Failed to save message").await;
                    }
                }
            }
            other => {
                send_error(&tx, &format!("Unknown action: {}", other)).await;
            }
        }
    }

    for (room_id, task) in joined {
        task.abort();
        let _ = task.await;
        state.prune_room_channel(room_id);
    }
    writer.abort();
    tracing::debug!(user_id, "WebSocket connection closed");
}

/// Pipe one room's broadcast frames to a client's outbound channel.
/// A lagged client skips the frames it missed and keeps receiving;
/// only a closed channel or a gone client ends the task.
async fn forward_room_frames(mut receiver: broadcast::Receiver<String>, tx: mpsc::Sender<String>) {
    loop {
        match receiver.recv().await {
            Ok(frame) => {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Client fell behind room broadcast");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwarder_survives_lag() {
        let (room_tx, room_rx) = broadcast::channel(2);
        // Overflow the channel before the forwarder gets to run
        for i in 0..5 {
            room_tx.send(format!("frame {}", i)).unwrap();
        }

        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(forward_room_frames(room_rx, tx));

        // The retained frames still arrive after the lag
        assert_eq!(rx.recv().await.unwrap(), "frame 3");
        assert_eq!(rx.recv().await.unwrap(), "frame 4");

        // And the forwarder keeps delivering new ones
        room_tx.send("after".to_string()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "after");

        drop(room_tx);
        task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forwarder_stops_when_client_gone() {
        let (room_tx, room_rx) = broadcast::channel(8);
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(forward_room_frames(room_rx, tx));

        drop(rx);
        room_tx.send("unheard".to_string()).unwrap();
        task.await.unwrap();
    }
}

fn broadcast(state: &AppState, room_id: i64, frame: serde_json::Value) {
    // Send fails only when the room has no listeners, which is fine
    let _ = state.room_channel(room_id).send(frame.to_string());
}

async fn send_error(tx: &mpsc::Sender<String>, message: &str) {
    let frame = json!({"event": "error", "message": message}).to_string();
    let _ = tx.send(frame).await;
}
