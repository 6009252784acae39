//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_MAX_PASTE_SIZE, DEFAULT_OAUTH_AUTHORIZE_URL, DEFAULT_OAUTH_PROFILE_URL,
    DEFAULT_OAUTH_TOKEN_URL, DEFAULT_PAGE_SIZE, DEFAULT_PORT, MAX_PAGE_SIZE,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Runtime configuration for threadpaste.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub max_paste_size: usize,
    pub page_size: usize,
    /// Externally visible base URL, used to build the OAuth redirect URI.
    pub public_url: String,
    pub oauth: OAuthConfig,
}

/// OAuth2 identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    /// Profile field holding the stable provider id.
    pub id_field: String,
    /// Profile field holding the display name.
    pub name_field: String,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    // Windows
    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl OAuthConfig {
    /// Load provider settings from `OAUTH_*` environment variables.
    ///
    /// # Returns
    /// Provider settings, defaulting to the Weibo OAuth2 endpoints.
    pub fn from_env() -> Self {
        Self {
            client_id: env_string("OAUTH_CLIENT_ID", ""),
            client_secret: env_string("OAUTH_CLIENT_SECRET", ""),
            authorize_url: env_string("OAUTH_AUTHORIZE_URL", DEFAULT_OAUTH_AUTHORIZE_URL),
            token_url: env_string("OAUTH_TOKEN_URL", DEFAULT_OAUTH_TOKEN_URL),
            profile_url: env_string("OAUTH_PROFILE_URL", DEFAULT_OAUTH_PROFILE_URL),
            id_field: env_string("OAUTH_ID_FIELD", "id"),
            name_field: env_string("OAUTH_NAME_FIELD", "name"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let port = env_parsed("PORT", DEFAULT_PORT);
        Self {
            db_path: env::var("DB_PATH").map(expand_tilde).unwrap_or_else(|_| {
                let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
                let cache_dir = home.join(".cache").join("threadpaste");
                cache_dir.join("db").to_string_lossy().to_string()
            }),
            port,
            max_paste_size: env_parsed("MAX_PASTE_SIZE", DEFAULT_MAX_PASTE_SIZE),
            page_size: env_parsed("PAGE_SIZE", DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            public_url: env_string("PUBLIC_URL", &format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            oauth: OAuthConfig::from_env(),
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }

    /// Absolute callback URL registered with the identity provider.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/login/authorized", self.public_url)
    }
}
