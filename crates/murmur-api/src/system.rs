use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, warn};

use murmur_types::events::FeedEvent;

use crate::error::FeedError;
use crate::state::{AppState, blocking};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, FeedError> {
    blocking(&state, |db| db.ping()).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /events — pushes every [`FeedEvent`] to the client as JSON text frames.
pub async fn events(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rx = state.dispatcher.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, rx))
}

async fn forward_events(mut socket: WebSocket, mut rx: broadcast::Receiver<FeedEvent>) {
    debug!("Event subscriber connected");
    loop {
        match rx.recv().await {
            Ok(event) => {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize feed event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event subscriber lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("Event subscriber disconnected");
}
