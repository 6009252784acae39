//! Paste HTTP handlers.

use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{OriginalUri, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use threadpaste_core::models::paste::{CreatePasteRequest, Paste, PastePage, Thread};

/// One page of the caller's pastes with navigation numbers.
#[derive(Debug, Serialize)]
pub struct PastePageView {
    pub items: Vec<Paste>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
    pub prev_num: Option<usize>,
    pub next_num: Option<usize>,
}

impl From<PastePage> for PastePageView {
    fn from(page: PastePage) -> Self {
        Self {
            pages: page.pages(),
            prev_num: page.prev_num(),
            next_num: page.next_num(),
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            items: page.items,
        }
    }
}

/// Create a new paste, optionally as a reply.
///
/// # Arguments
/// - `state`: Application state.
/// - `headers`: Request headers carrying the session cookie.
/// - `req`: Paste creation payload.
///
/// # Returns
/// The created paste as JSON.
///
/// # Errors
/// Returns an error if validation or persistence fails, or the parent is missing.
pub async fn create_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePasteRequest>,
) -> Result<Json<Paste>, HttpError> {
    let ctx = state.request_context(&headers)?;
    let paste = state.service.submit(&ctx, req.content, req.reply_to)?;
    Ok(Json(paste))
}

/// Fetch a paste with its direct replies.
///
/// # Errors
/// Returns [`AppError::NotFound`] when the paste does not exist.
pub async fn get_paste(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Thread>, HttpError> {
    Ok(Json(state.service.thread(id)?))
}

/// Delete a paste owned by the caller.
///
/// # Returns
/// `{ "success": true }` on success.
///
/// # Errors
/// 404 when missing, 401 unless the caller authored the paste.
pub async fn delete_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let ctx = state.request_context(&headers)?;
    state.service.delete(&ctx, id)?;
    Ok(Json(json!({ "success": true })))
}

/// `/login?next=...` carrying the full request target, percent-encoded.
fn login_redirect(uri: &OriginalUri) -> Result<String, AppError> {
    let target = uri
        .0
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.0.path());
    let login = reqwest::Url::parse_with_params("http://localhost/login", &[("next", target)])
        .map_err(|_| AppError::Internal)?;
    Ok(format!("{}?{}", login.path(), login.query().unwrap_or_default()))
}

fn my_pastes_response(
    state: &AppState,
    headers: &HeaderMap,
    uri: &OriginalUri,
    page: usize,
) -> Result<Response, HttpError> {
    let ctx = state.request_context(headers)?;
    if ctx.user.is_none() {
        return Ok(Redirect::to(&login_redirect(uri)?).into_response());
    }
    let listing = state.service.list_mine(&ctx, page)?;
    if listing.is_out_of_range() {
        return Err(AppError::NotFound.into());
    }
    Ok(Json(PastePageView::from(listing)).into_response())
}

/// First page of the caller's pastes, newest first.
///
/// Anonymous callers are redirected to the login flow.
pub async fn my_pastes(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: OriginalUri,
) -> Result<Response, HttpError> {
    my_pastes_response(&state, &headers, &uri, 1)
}

/// A specific page of the caller's pastes.
///
/// # Errors
/// Returns 404 for page 0 or an empty page past the first.
pub async fn my_pastes_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: OriginalUri,
    Path(page): Path<usize>,
) -> Result<Response, HttpError> {
    my_pastes_response(&state, &headers, &uri, page)
}
