//! WebSocket support for live session updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ffmfy_core::{EngineStatus, SessionEvent, SessionSnapshot};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// The session moved to a new state (also sent once on connect).
    StateChanged { snapshot: SessionSnapshot },
    /// Conversion progress for the running job.
    Progress {
        job_id: Uuid,
        /// Percentage (0.0 - 100.0)
        progress: f64,
    },
    /// Engine load status changed.
    EngineStatus { status: EngineStatus },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn type_label(&self) -> &'static str {
        match self {
            WsMessage::StateChanged { .. } => "state_changed",
            WsMessage::Progress { .. } => "progress",
            WsMessage::EngineStatus { .. } => "engine_status",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

impl From<SessionEvent> for WsMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::StateChanged { snapshot } => WsMessage::StateChanged { snapshot },
            SessionEvent::Progress { job_id, progress } => WsMessage::Progress { job_id, progress },
            SessionEvent::EngineStatus { status } => WsMessage::EngineStatus { status },
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Serialize and send one message. Returns false once the client is gone.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> bool {
    WS_MESSAGES_SENT.with_label_values(&[msg.type_label()]).inc();

    match serde_json::to_string(msg) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                return false;
            }
            true
        }
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            true
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no transition is missed
    let mut rx = state.orchestrator().subscribe();
    let snapshot = state.orchestrator().snapshot().await;

    // Track connection metrics
    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    // Spawn task to forward session events to this client
    let send_task = tokio::spawn(async move {
        if !send_message(&mut sender, &WsMessage::StateChanged { snapshot }).await {
            return;
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            if !send_message(&mut sender, &WsMessage::from(event)).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("WebSocket client lagged, skipped {} messages", n);
                            WS_LAG_EVENTS.inc();
                            // Continue receiving - the next state change catches the client up
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Session event channel closed");
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    let msg = WsMessage::Heartbeat {
                        timestamp: chrono::Utc::now().timestamp(),
                    };
                    if !send_message(&mut sender, &msg).await {
                        break;
                    }
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                // We don't expect any client messages, but log them
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message_json() {
        let job_id = Uuid::new_v4();
        let msg = WsMessage::from(SessionEvent::Progress {
            job_id,
            progress: 42.5,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["job_id"], job_id.to_string());
        assert_eq!(json["progress"], 42.5);
        assert_eq!(msg.type_label(), "progress");
    }

    #[test]
    fn test_engine_status_message_json() {
        let msg = WsMessage::from(SessionEvent::EngineStatus {
            status: EngineStatus::Ready,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "engine_status");
        assert_eq!(json["status"]["status"], "ready");
    }

    #[test]
    fn test_heartbeat_json() {
        let json = serde_json::to_value(WsMessage::Heartbeat { timestamp: 7 }).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["timestamp"], 7);
    }
}
