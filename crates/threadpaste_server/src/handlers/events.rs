//! WebSocket streams of reply notifications.

use crate::{error::HttpError, AppError, AppState, ChannelBus};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use threadpaste_core::Channel;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

fn subscribe(
    state: &AppState,
    channel: Channel,
) -> Result<broadcast::Receiver<serde_json::Value>, HttpError> {
    state
        .bus
        .subscribe(&channel.to_string())
        .map_err(|err| AppError::StorageMessage(err.to_string()).into())
}

/// Stream replies to a paste.
///
/// # Errors
/// Returns 404 when the paste does not exist.
pub async fn thread_events(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ws: WebSocketUpgrade,
) -> Result<Response, HttpError> {
    state.service.paste(id)?;
    let channel = Channel::Thread(id);
    let rx = subscribe(&state, channel)?;
    let bus = state.bus.clone();
    Ok(ws.on_upgrade(move |socket| forward_notices(socket, bus, rx, channel)))
}

/// Stream replies to any paste written by the signed-in caller.
///
/// # Errors
/// Returns 401 for anonymous callers.
pub async fn user_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, HttpError> {
    let ctx = state.request_context(&headers)?;
    let user_id = ctx.user_id().ok_or(AppError::Unauthorized)?;
    let channel = Channel::User(user_id);
    let rx = subscribe(&state, channel)?;
    let bus = state.bus.clone();
    Ok(ws.on_upgrade(move |socket| forward_notices(socket, bus, rx, channel)))
}

async fn forward_notices(
    mut socket: WebSocket,
    bus: Arc<ChannelBus>,
    mut rx: broadcast::Receiver<serde_json::Value>,
    channel: Channel,
) {
    info!(%channel, "WebSocket subscriber connected");

    loop {
        tokio::select! {
            notice = rx.recv() => match notice {
                Ok(payload) => {
                    if let Err(e) = socket.send(Message::Text(payload.to_string())).await {
                        info!(%channel, "WebSocket send error: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%channel, skipped, "WebSocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Subscribers are read-only; pings are answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }

    bus.release(&channel.to_string(), rx);
    info!(%channel, "WebSocket subscriber disconnected");
}
