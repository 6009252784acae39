//! Shared constants used across threadpaste crates.

use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 38420;

/// Default maximum paste size accepted by the API layer.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 1024 * 1024;

/// Default number of pastes per "my pastes" page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound for a configured page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Default OAuth2 endpoints (Weibo).
pub const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://api.weibo.com/oauth2/authorize";
/// Token exchange endpoint used when `OAUTH_TOKEN_URL` is unset.
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://api.weibo.com/oauth2/access_token";
/// Profile endpoint used when `OAUTH_PROFILE_URL` is unset.
pub const DEFAULT_OAUTH_PROFILE_URL: &str = "https://api.weibo.com/2/users/show.json";

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "threadpaste_session";

/// Channel key prefix for reply threads.
pub const THREAD_CHANNEL_PREFIX: &str = "thread";
/// Channel key prefix for per-user reply notifications.
pub const USER_CHANNEL_PREFIX: &str = "user";

/// How long an issued OAuth `state` stays redeemable.
pub const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);
/// Upper bound on concurrently pending OAuth handshakes.
pub const MAX_PENDING_LOGINS: usize = 10_000;
/// Idle lifetime of a signed-in session.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
