//! Realtime updates over WebSocket.
//!
//! Clients connect with their session token, then subscribe to topics:
//! `profile` streams the caller's own verification status changes, `queue`
//! (administrators only) streams review-queue changes. Each subscription
//! first receives a snapshot of current state, so a reconnect converges to
//! the same state as a fresh subscription.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::types::RequestSummary;
use crate::api::AppState;
use crate::models::user::UserProfile;

#[derive(Debug, Deserialize)]
pub struct WsAuth {
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Profile,
    Queue,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Profile => f.write_str("profile"),
            Topic::Queue => f.write_str("queue"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack { action: String, topic: Topic },
    Error { message: String },
    Pong,
}

type WsSink = Arc<tokio::sync::Mutex<SplitSink<WebSocket, Message>>>;

/// Upgrade handler. The token is checked before the upgrade completes; an
/// invalid token never opens a socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
    Query(auth): Query<WsAuth>,
) -> Result<impl IntoResponse, StatusCode> {
    let profile = state
        .auth
        .current_profile(&auth.token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, profile)))
}

async fn handle_socket(socket: WebSocket, state: AppState, profile: UserProfile) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSink = Arc::new(tokio::sync::Mutex::new(ws_sender));

    let mut forwarder_handles: HashMap<Topic, tokio::task::JoinHandle<()>> = HashMap::new();

    debug!(user_id = %profile.id, "WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_text_message(&text, &state, &profile, &mut forwarder_handles, &ws_sender)
                    .await;
            }
            Message::Close(_) => {
                debug!("Client sent close frame");
                break;
            }
            Message::Ping(data) => {
                let mut sender = ws_sender.lock().await;
                let _ = sender.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (topic, handle) in forwarder_handles.drain() {
        debug!("Aborting forwarder for topic: {}", topic);
        handle.abort();
    }
    debug!(user_id = %profile.id, "WebSocket client disconnected");
}

async fn handle_text_message(
    text: &str,
    state: &AppState,
    profile: &UserProfile,
    forwarder_handles: &mut HashMap<Topic, tokio::task::JoinHandle<()>>,
    ws_sender: &WsSink,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            send_server_message(
                ws_sender,
                &ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                },
            )
            .await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Subscribe { topic } => {
            // The queue topic is gated before anything is fetched.
            if topic == Topic::Queue && !profile.is_admin {
                info!(action = "queue_subscribe_denied", user_id = %profile.id);
                send_server_message(
                    ws_sender,
                    &ServerMessage::Error {
                        message: "Administrator access required".to_string(),
                    },
                )
                .await;
                return;
            }

            // If already subscribed, abort the old forwarder first.
            if let Some(handle) = forwarder_handles.remove(&topic) {
                handle.abort();
            }

            let rx = match topic {
                Topic::Profile => state.events.profile_tx.subscribe(),
                Topic::Queue => state.events.queue_tx.subscribe(),
            };

            send_server_message(
                ws_sender,
                &ServerMessage::Ack {
                    action: "subscribe".to_string(),
                    topic,
                },
            )
            .await;

            // Snapshot first, so a reconnect sees current state even when
            // no further writes happen.
            send_snapshot(state, profile, topic, ws_sender).await;

            let sender = ws_sender.clone();
            let own_id = profile.id;
            let handle = tokio::spawn(async move {
                forward_events(rx, sender, topic, own_id).await;
            });
            forwarder_handles.insert(topic, handle);

            debug!(user_id = %profile.id, "Client subscribed to {}", topic);
        }
        ClientMessage::Unsubscribe { topic } => {
            let message = if let Some(handle) = forwarder_handles.remove(&topic) {
                handle.abort();
                ServerMessage::Ack {
                    action: "unsubscribe".to_string(),
                    topic,
                }
            } else {
                ServerMessage::Error {
                    message: format!("Not subscribed to {}", topic),
                }
            };
            send_server_message(ws_sender, &message).await;
        }
        ClientMessage::Ping => {
            send_server_message(ws_sender, &ServerMessage::Pong).await;
        }
    }
}

async fn send_snapshot(state: &AppState, profile: &UserProfile, topic: Topic, ws_sender: &WsSink) {
    let snapshot = match topic {
        Topic::Profile => match state.db.get_user_by_id(&profile.id).await {
            Ok(current) => serde_json::json!({
                "topic": "profile",
                "data": {
                    "kind": "snapshot",
                    "user_id": current.id,
                    "verification_status": current.verification_status,
                    "rejection_reason": current.rejection_reason,
                    "id_image_url": current.id_image_url,
                },
            }),
            Err(e) => {
                warn!("Profile snapshot failed: {}", e);
                return;
            }
        },
        Topic::Queue => match state.verification.pending_requests().await {
            Ok(requests) => {
                let requests: Vec<RequestSummary> = requests.into_iter().map(Into::into).collect();
                serde_json::json!({
                    "topic": "queue",
                    "data": {
                        "kind": "snapshot",
                        "pending_count": requests.len(),
                        "requests": requests,
                    },
                })
            }
            Err(e) => {
                warn!("Queue snapshot failed: {}", e);
                return;
            }
        },
    };

    let mut sender = ws_sender.lock().await;
    let _ = sender.send(Message::Text(snapshot.to_string())).await;
}

/// Forwarder task: reads events from a broadcast receiver and sends
/// matching ones to the client. Profile events are filtered to the
/// connection's own user.
async fn forward_events(
    mut rx: broadcast::Receiver<String>,
    ws_sender: WsSink,
    topic: Topic,
    own_id: Uuid,
) {
    loop {
        match rx.recv().await {
            Ok(event_str) => {
                let should_send = match topic {
                    Topic::Queue => true,
                    Topic::Profile => serde_json::from_str::<serde_json::Value>(&event_str)
                        .ok()
                        .and_then(|v| {
                            v["data"]["user_id"]
                                .as_str()
                                .map(|id| id == own_id.to_string())
                        })
                        .unwrap_or(false),
                };

                if should_send {
                    let mut sender = ws_sender.lock().await;
                    if sender.send(Message::Text(event_str)).await.is_err() {
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Client lagged behind by {} events on topic {}", n, topic);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Broadcast channel closed for topic {}", topic);
                break;
            }
        }
    }
}

async fn send_server_message(ws_sender: &WsSink, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            return;
        }
    };
    let mut sender = ws_sender.lock().await;
    let _ = sender.send(Message::Text(payload)).await;
}
