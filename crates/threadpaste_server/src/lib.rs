//! HTTP server wiring for threadpaste (API, auth, live reply streams).

/// In-memory pub/sub bus backing reply notifications.
pub mod bus;
/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for pastes, login and event streams.
pub mod handlers;
/// OAuth2 authorization-code client.
pub mod oauth;
/// Cookie sessions and pending logins.
pub mod session;

pub use bus::ChannelBus;
pub use oauth::OAuthClient;
pub use session::SessionStore;
pub use threadpaste_core::{
    config, db, models, AppError, Config, Database, PasteService, RequestContext, DEFAULT_PORT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderValue, Method},
    routing::get,
    Router,
};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use threadpaste_core::ReplyNotifier;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Buffered notices per channel before slow subscribers start lagging.
pub const CHANNEL_CAPACITY: usize = 64;

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: PasteService,
    pub config: Arc<Config>,
    pub bus: Arc<ChannelBus>,
    pub sessions: Arc<SessionStore>,
    pub oauth: Arc<OAuthClient>,
}

impl AppState {
    /// Construct shared application state.
    ///
    /// Replies created through [`AppState::service`] are published on
    /// [`AppState::bus`].
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `db`: Open database handle.
    pub fn new(config: Config, db: Database) -> Self {
        let bus = Arc::new(ChannelBus::new(CHANNEL_CAPACITY));
        let notifier = ReplyNotifier::new(bus.clone());
        let service = PasteService::new(
            Arc::new(db),
            notifier,
            config.max_paste_size,
            config.page_size,
        );
        Self {
            service,
            oauth: Arc::new(OAuthClient::new(config.oauth.clone())),
            config: Arc::new(config),
            bus,
            sessions: Arc::new(SessionStore::default()),
        }
    }

    /// Resolve the caller from the session cookie in `headers`.
    ///
    /// Missing, unknown, or stale sessions yield an anonymous context.
    ///
    /// # Errors
    /// Returns an error when the session table or user lookup fails.
    pub fn request_context(&self, headers: &HeaderMap) -> Result<RequestContext, AppError> {
        let Some(token) = session::session_token(headers) else {
            return Ok(RequestContext::anonymous());
        };
        let Some(user_id) = self.sessions.user_id(&token)? else {
            return Ok(RequestContext::anonymous());
        };
        Ok(match self.service.user(user_id)? {
            Some(user) => RequestContext::for_user(user),
            None => RequestContext::anonymous(),
        })
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
///
/// # Returns
/// Configured `axum::Router`.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from env var overrides and security policy.
///
/// # Arguments
/// - `config`: Server configuration containing the configured `port`.
/// - `allow_public_access`: Whether non-loopback bind targets are permitted.
///
/// # Returns
/// A validated socket address that enforces loopback when public access is disabled.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], config.port));
    let requested = match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

fn allowed_origins(public_url: &str, cors_port: u16) -> Vec<HeaderValue> {
    [
        public_url.to_string(),
        format!("http://localhost:{}", cors_port),
        format!("http://127.0.0.1:{}", cors_port),
    ]
    .iter()
    .filter_map(|origin| HeaderValue::from_str(origin).ok())
    .collect()
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    let methods = [Method::GET, Method::POST, Method::DELETE];
    let cors = if allow_public_access {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins(&state.config.public_url, cors_port))
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true)
    };
    let body_limit = state.config.max_paste_size.saturating_add(4096);

    Router::new()
        .route("/", get(handlers::index))
        // Pastes
        .route("/api/paste", axum::routing::post(handlers::paste::create_paste))
        .route(
            "/api/paste/:id",
            get(handlers::paste::get_paste).delete(handlers::paste::delete_paste),
        )
        .route("/api/my-pastes", get(handlers::paste::my_pastes))
        .route("/api/my-pastes/page/:page", get(handlers::paste::my_pastes_page))
        // Login
        .route("/login", get(handlers::auth::login))
        .route("/login/authorized", get(handlers::auth::authorized))
        .route("/logout", get(handlers::auth::logout))
        // Live reply streams
        .route("/ws/thread/:id", get(handlers::events::thread_events))
        .route("/ws/user", get(handlers::events::user_events))
        .with_state(state)
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Run the Axum server with graceful shutdown support.
///
/// # Arguments
/// - `listener`: Bound TCP listener for the server.
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
/// - `shutdown_signal`: Future that resolves when shutdown should start.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}
