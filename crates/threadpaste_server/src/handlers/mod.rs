//! HTTP request handlers.

/// Login, OAuth callback and logout.
pub mod auth;
/// WebSocket reply streams.
pub mod events;
/// Paste-related endpoints.
pub mod paste;

use crate::{error::HttpError, AppState};
use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

/// Describe the service and the signed-in user, if any.
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, HttpError> {
    let ctx = state.request_context(&headers)?;
    Ok(Json(json!({
        "name": "threadpaste",
        "version": env!("CARGO_PKG_VERSION"),
        "user": ctx.user,
    })))
}
