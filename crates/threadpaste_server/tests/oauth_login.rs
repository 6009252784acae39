//! OAuth login flow against a throwaway in-process identity provider.

mod support;

use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use support::{test_config_for_db_path, test_oauth_config, test_server_for_config};
use tempfile::TempDir;

const ACCESS_TOKEN: &str = "provider-token";

#[derive(Clone)]
struct FakeProvider {
    display_name: Arc<Mutex<String>>,
}

async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
    if form.get("grant_type").map(String::as_str) != Some("authorization_code")
        || form.get("code").map(String::as_str) != Some("good-code")
    {
        return (StatusCode::BAD_REQUEST, json!({ "error": "invalid_grant" }).to_string());
    }
    // Text body, as some providers send it.
    (
        StatusCode::OK,
        json!({ "access_token": ACCESS_TOKEN, "uid": "1001" }).to_string(),
    )
}

async fn profile(
    State(provider): State<FakeProvider>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if query.get("access_token").map(String::as_str) != Some(ACCESS_TOKEN)
        || query.get("uid").map(String::as_str) != Some("1001")
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad token" })));
    }
    let name = provider.display_name.lock().expect("name lock").clone();
    (StatusCode::OK, Json(json!({ "id": 1001, "name": name })))
}

async fn spawn_provider(initial_name: &str) -> (String, Arc<Mutex<String>>) {
    let display_name = Arc::new(Mutex::new(initial_name.to_string()));
    let app = Router::new()
        .route("/oauth2/access_token", post(token))
        .route("/users/show.json", get(profile))
        .with_state(FakeProvider {
            display_name: display_name.clone(),
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("provider listener");
    let addr = listener.local_addr().expect("provider addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("provider serve");
    });
    (format!("http://{}", addr), display_name)
}

fn header_str(response: &axum_test::TestResponse, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .expect("header present")
        .to_str()
        .expect("ascii header")
        .to_string()
}

fn state_param(location: &str) -> String {
    let url = reqwest::Url::parse(location).expect("authorize url");
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state param")
}

async fn setup_with_provider(
    initial_name: &str,
) -> (
    axum_test::TestServer,
    TempDir,
    threadpaste_server::AppState,
    Arc<Mutex<String>>,
) {
    let (base, display_name) = spawn_provider(initial_name).await;
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = test_config_for_db_path(&temp_dir.path().join("test.db"));
    config.oauth = test_oauth_config(&base);
    let (server, state) = test_server_for_config(config);
    (server, temp_dir, state, display_name)
}

#[tokio::test]
async fn test_login_round_trip_sets_session_and_redirects_to_next() {
    let (server, _temp, state, _name) = setup_with_provider("Bob").await;

    let login = server.get("/login").add_query_param("next", "/api/my-pastes").await;
    assert_eq!(login.status_code(), StatusCode::SEE_OTHER);
    let authorize = header_str(&login, header::LOCATION);
    assert!(authorize.contains("/oauth2/authorize?"));
    assert!(authorize.contains("client_id=test-client"));
    assert!(authorize.contains("response_type=code"));
    let login_state = state_param(&authorize);

    let callback = server
        .get("/login/authorized")
        .add_query_param("code", "good-code")
        .add_query_param("state", &login_state)
        .await;
    assert_eq!(callback.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&callback, header::LOCATION), "/api/my-pastes");
    let set_cookie = header_str(&callback, header::SET_COOKIE);
    assert!(set_cookie.starts_with("threadpaste_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));

    let session = set_cookie.split(';').next().expect("cookie pair").to_string();
    let listing = server
        .get("/api/my-pastes")
        .add_header(
            header::COOKIE,
            header::HeaderValue::from_str(&session).expect("cookie value"),
        )
        .await;
    assert_eq!(listing.status_code(), StatusCode::OK);
    let body: Value = listing.json();
    assert_eq!(body["total"], 0);

    let users = state.service.db().users.list().expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].provider_id, "1001");
    assert_eq!(users[0].display_name, "Bob");

    // State values are single use.
    let replay = server
        .get("/login/authorized")
        .add_query_param("code", "good-code")
        .add_query_param("state", &login_state)
        .await;
    assert_eq!(replay.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_relogin_refreshes_display_name_without_duplicate() {
    let (server, _temp, state, name) = setup_with_provider("Bob").await;

    for expected in ["Bob", "Robert"] {
        *name.lock().expect("name lock") = expected.to_string();
        let login = server.get("/login").await;
        let login_state = state_param(&header_str(&login, header::LOCATION));
        let callback = server
            .get("/login/authorized")
            .add_query_param("code", "good-code")
            .add_query_param("state", &login_state)
            .await;
        assert_eq!(callback.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(header_str(&callback, header::LOCATION), "/");

        let users = state.service.db().users.list().expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, expected);
    }
}

#[tokio::test]
async fn test_callback_rejects_unknown_state_and_honors_denial() {
    let (server, _temp, state, _name) = setup_with_provider("Bob").await;

    let forged = server
        .get("/login/authorized")
        .add_query_param("code", "good-code")
        .add_query_param("state", "forged")
        .await;
    assert_eq!(forged.status_code(), StatusCode::BAD_REQUEST);

    let login = server.get("/login").add_query_param("next", "/api/paste/1").await;
    let login_state = state_param(&header_str(&login, header::LOCATION));
    let denied = server
        .get("/login/authorized")
        .add_query_param("error", "access_denied")
        .add_query_param("state", &login_state)
        .await;
    assert_eq!(denied.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&denied, header::LOCATION), "/api/paste/1");
    assert!(denied.headers().get(header::SET_COOKIE).is_none());
    assert!(state.service.db().users.list().expect("users").is_empty());
}

#[tokio::test]
async fn test_login_drops_offsite_next_and_surfaces_provider_failures() {
    let (server, _temp, state, _name) = setup_with_provider("Bob").await;

    let login = server
        .get("/login")
        .add_query_param("next", "https://evil.example/")
        .await;
    let login_state = state_param(&header_str(&login, header::LOCATION));
    let denied = server
        .get("/login/authorized")
        .add_query_param("error", "access_denied")
        .add_query_param("state", &login_state)
        .await;
    assert_eq!(header_str(&denied, header::LOCATION), "/");

    let login = server.get("/login").await;
    let login_state = state_param(&header_str(&login, header::LOCATION));
    let bad_code = server
        .get("/login/authorized")
        .add_query_param("code", "bad-code")
        .add_query_param("state", &login_state)
        .await;
    assert_eq!(bad_code.status_code(), StatusCode::BAD_GATEWAY);
    assert!(state.service.db().users.list().expect("users").is_empty());
}

#[tokio::test]
async fn test_login_without_client_id_is_unavailable() {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = test_config_for_db_path(&temp_dir.path().join("test.db"));
    config.oauth.client_id = String::new();
    let (server, state) = test_server_for_config(config);

    let login = server.get("/login").await;
    assert_eq!(login.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.sessions.pending_login_count(), 0);
}
