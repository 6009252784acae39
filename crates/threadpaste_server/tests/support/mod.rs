//! Shared integration-test server bootstrap helpers.

#![allow(dead_code)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use std::path::Path;
use tempfile::TempDir;
use threadpaste_core::models::user::{ProviderIdentity, User};
use threadpaste_core::OAuthConfig;
use threadpaste_server::{create_app, AppState, Config, Database};

pub(crate) fn test_oauth_config(provider_base: &str) -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        authorize_url: format!("{}/oauth2/authorize", provider_base),
        token_url: format!("{}/oauth2/access_token", provider_base),
        profile_url: format!("{}/users/show.json", provider_base),
        id_field: "id".to_string(),
        name_field: "name".to_string(),
    }
}

pub(crate) fn test_config_for_db_path(db_path: &Path) -> Config {
    Config {
        port: 0,
        db_path: db_path.to_str().expect("db path").to_string(),
        max_paste_size: 10_000,
        page_size: 2,
        public_url: "http://localhost:38420".to_string(),
        oauth: test_oauth_config("http://127.0.0.1:9"),
    }
}

pub(crate) fn test_server_for_config(config: Config) -> (TestServer, AppState) {
    let db = Database::new(config.db_path.as_str()).expect("open db");
    let state = AppState::new(config, db);
    let app = create_app(state.clone(), false);
    let server = TestServer::new(app).expect("server");
    (server, state)
}

/// Server bound to a real local socket, needed for WebSocket upgrades.
pub(crate) fn setup_ws_test_server() -> (TestServer, TempDir, AppState) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_db_path(&temp_dir.path().join("test.db"));
    let db = Database::new(config.db_path.as_str()).expect("open db");
    let state = AppState::new(config, db);
    let server = TestServer::builder()
        .http_transport()
        .build(create_app(state.clone(), false))
        .expect("server");
    (server, temp_dir, state)
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir, AppState) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = test_config_for_db_path(&db_path);
    let (server, state) = test_server_for_config(config);
    (server, temp_dir, state)
}

/// Create (or refresh) a user and open a session for it.
///
/// # Returns
/// The user and a `Cookie` header value carrying the session.
pub(crate) fn sign_in(state: &AppState, provider_id: &str, name: &str) -> (User, HeaderValue) {
    let user = state
        .service
        .login(&ProviderIdentity {
            provider_id: provider_id.to_string(),
            display_name: name.to_string(),
        })
        .expect("login");
    let token = state.sessions.start(user.id).expect("session");
    let cookie = HeaderValue::from_str(&format!("threadpaste_session={}", token))
        .expect("cookie header");
    (user, cookie)
}
