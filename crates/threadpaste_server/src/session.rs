//! Cookie sessions and pending OAuth logins.
//!
//! Both tables live in memory; restarting the server signs everyone out.

use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use threadpaste_core::constants::{
    MAX_PENDING_LOGINS, PENDING_LOGIN_TTL, SESSION_COOKIE_NAME, SESSION_TTL,
};
use threadpaste_core::AppError;
use uuid::Uuid;

struct Session {
    user_id: u64,
    last_seen: Instant,
}

struct PendingLogin {
    issued_at: Instant,
    next: Option<String>,
}

#[derive(Default)]
struct SessionState {
    /// Session token -> user.
    sessions: HashMap<String, Session>,
    /// OAuth `state` -> post-login redirect path.
    pending_logins: HashMap<String, PendingLogin>,
}

/// Tracks signed-in sessions and in-flight OAuth handshakes.
///
/// Sessions expire after a period without use; pending logins expire a fixed
/// time after they are issued and are capped in number, oldest evicted first.
pub struct SessionStore {
    inner: Mutex<SessionState>,
    login_ttl: Duration,
    session_ttl: Duration,
    max_pending_logins: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(PENDING_LOGIN_TTL, SESSION_TTL, MAX_PENDING_LOGINS)
    }
}

impl SessionStore {
    /// Create a store with explicit expiry and capacity limits.
    pub fn with_limits(
        login_ttl: Duration,
        session_ttl: Duration,
        max_pending_logins: usize,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionState::default()),
            login_ttl,
            session_ttl,
            max_pending_logins: max_pending_logins.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::StorageMessage("Session store is unavailable.".to_string()))
    }

    fn prune(&self, state: &mut SessionState, now: Instant) {
        state
            .pending_logins
            .retain(|_, login| now.duration_since(login.issued_at) < self.login_ttl);
        state
            .sessions
            .retain(|_, session| now.duration_since(session.last_seen) < self.session_ttl);
    }

    /// Start a session for `user_id`.
    ///
    /// # Returns
    /// The opaque token to place in the session cookie.
    pub fn start(&self, user_id: u64) -> Result<String, AppError> {
        let token = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut state = self.lock()?;
        self.prune(&mut state, now);
        state.sessions.insert(
            token.clone(),
            Session {
                user_id,
                last_seen: now,
            },
        );
        Ok(token)
    }

    /// User id for a session token, if the session is live.
    ///
    /// A successful lookup keeps the session alive.
    pub fn user_id(&self, token: &str) -> Result<Option<u64>, AppError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        let Some(session) = state.sessions.get_mut(token) else {
            return Ok(None);
        };
        if now.duration_since(session.last_seen) >= self.session_ttl {
            state.sessions.remove(token);
            return Ok(None);
        }
        session.last_seen = now;
        Ok(Some(session.user_id))
    }

    /// End a session. Unknown tokens are ignored.
    pub fn end(&self, token: &str) -> Result<(), AppError> {
        self.lock()?.sessions.remove(token);
        Ok(())
    }

    /// Record a new OAuth handshake.
    ///
    /// # Returns
    /// The `state` value to send to the identity provider.
    pub fn begin_login(&self, next: Option<String>) -> Result<String, AppError> {
        let token = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut state = self.lock()?;
        self.prune(&mut state, now);
        while state.pending_logins.len() >= self.max_pending_logins {
            let Some(oldest) = state
                .pending_logins
                .iter()
                .min_by_key(|(_, login)| login.issued_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            state.pending_logins.remove(&oldest);
        }
        state.pending_logins.insert(
            token.clone(),
            PendingLogin {
                issued_at: now,
                next,
            },
        );
        Ok(token)
    }

    /// Consume a pending handshake.
    ///
    /// # Returns
    /// `None` when `state` was never issued, was already used, or has
    /// expired, otherwise the remembered redirect path (itself optional).
    pub fn finish_login(&self, state: &str) -> Result<Option<Option<String>>, AppError> {
        let now = Instant::now();
        let mut inner = self.lock()?;
        self.prune(&mut inner, now);
        Ok(inner.pending_logins.remove(state).map(|login| login.next))
    }

    /// Number of handshakes still awaiting their callback.
    pub fn pending_login_count(&self) -> usize {
        self.lock()
            .map(|state| state.pending_logins.len())
            .unwrap_or(0)
    }
}

/// Extract the session token from a request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn cookie_attributes(secure: bool) -> &'static str {
    if secure {
        "Path=/; HttpOnly; SameSite=Lax; Secure"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    }
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; {}",
        SESSION_COOKIE_NAME,
        token,
        cookie_attributes(secure)
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn expired_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Max-Age=0; {}",
        SESSION_COOKIE_NAME,
        cookie_attributes(secure)
    )
}

/// Keep only same-origin absolute paths as post-login redirect targets.
pub fn sanitize_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        Some(next.to_string())
    } else {
        None
    }
}
