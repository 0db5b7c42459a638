use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{self, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ok, ok_with_message, ApiError, ApiJson, ApiResult};
use crate::generate_truncated_uuid;
use crate::models::{User, UserStatus};
use crate::store::{SessionEntry, Store};
use crate::AppState;

/// Live tokens kept per user; older ones are dropped on login.
pub const MAX_SESSIONS_PER_USER: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}

/// A caller holding a live token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u32,
    pub token: String,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl Store {
    pub fn login(&mut self, params: &LoginParams, now: DateTime<Utc>) -> Result<LoginResult, ApiError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.username == params.username)
            .ok_or(ApiError::InvalidCredentials)?;
        if user.password != params.password {
            return Err(ApiError::InvalidCredentials);
        }
        if user.status == UserStatus::Disabled {
            return Err(ApiError::PermissionDenied);
        }

        user.last_login_time = Some(now);
        let user = user.clone();
        let token = format!(
            "token-{}-{}-{}",
            user.id,
            now.timestamp_millis(),
            generate_truncated_uuid()
        );
        self.record_session(token.clone(), user.id);
        Ok(LoginResult { token, user })
    }

    /// Stores `token`, dropping the user's oldest tokens beyond
    /// [`MAX_SESSIONS_PER_USER`].
    fn record_session(&mut self, token: String, user_id: u32) {
        self.session_seq += 1;
        self.sessions.insert(
            token,
            SessionEntry {
                user_id,
                issued: self.session_seq,
            },
        );

        let mut owned: Vec<(u64, String)> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.user_id == user_id)
            .map(|(token, entry)| (entry.issued, token.clone()))
            .collect();
        if owned.len() <= MAX_SESSIONS_PER_USER {
            return;
        }
        owned.sort_unstable();
        let excess = owned.len() - MAX_SESSIONS_PER_USER;
        for (_, token) in owned.into_iter().take(excess) {
            tracing::debug!("evicting oldest session of user {}", user_id);
            self.sessions.remove(&token);
        }
    }

    pub fn session_user_id(&self, token: &str) -> Option<u32> {
        self.sessions.get(token).map(|entry| entry.user_id)
    }

    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops every token of `user_id` except `keep`.
    pub fn revoke_other_sessions(&mut self, user_id: u32, keep: &str) {
        self.sessions
            .retain(|token, entry| entry.user_id != user_id || token == keep);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let store = state.store.read().await;
        let user_id = store.session_user_id(&token).ok_or(ApiError::Unauthorized)?;
        Ok(Session { user_id, token })
    }
}

/// Route guard for the admin API, active when `REQUIRE_AUTH` is set.
pub async fn require_session(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    tracing::trace!("require_session started");
    if !state.config.require_auth {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::warn!("require_session missing bearer token");
        ApiError::Unauthorized
    })?;
    let known = state.store.read().await.session_user_id(&token).is_some();
    if !known {
        tracing::warn!("require_session unknown token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<LoginParams>,
) -> ApiResult<LoginResult> {
    tracing::info!("login attempt for {:?}", &params.username);
    let mut store = state.store.write().await;
    let result = store.login(&params, Utc::now())?;
    tracing::info!("login succeeded for user {}", result.user.id);
    Ok(ok(result))
}

pub async fn current_user(State(state): State<AppState>, session: Session) -> ApiResult<User> {
    let store = state.store.read().await;
    let user = store
        .user(session.user_id)
        .cloned()
        .ok_or(ApiError::Unauthorized)?;
    Ok(ok(user))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    if let Some(token) = bearer_token(&headers) {
        let removed = state.store.write().await.logout(&token);
        tracing::info!("logout (session found: {})", removed);
    }
    Ok(ok_with_message((), "Logged out"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/currentUser", get(current_user))
        .route("/api/auth/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::admin_user;
    use crate::store::fixtures;
    use axum::http::HeaderValue;

    fn store() -> Store {
        let mut store = Store::new();
        store.users.push(admin_user("secret", fixtures::at()));
        store
    }

    fn params(username: &str, password: &str) -> LoginParams {
        LoginParams {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn login_issues_a_session() {
        let mut store = store();
        let result = store.login(&params("admin", "secret"), fixtures::at()).unwrap();
        assert!(result.token.starts_with("token-1-"));
        assert_eq!(store.session_user_id(&result.token), Some(1));
        assert_eq!(store.user(1).unwrap().last_login_time, Some(fixtures::at()));
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let mut store = store();
        let a = store.login(&params("admin", "nope"), fixtures::at()).unwrap_err();
        let b = store.login(&params("ghost", "secret"), fixtures::at()).unwrap_err();
        assert_eq!(a.code(), "2003");
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn disabled_accounts_cannot_log_in() {
        let mut store = store();
        store.users[0].status = UserStatus::Disabled;
        let err = store.login(&params("admin", "secret"), fixtures::at()).unwrap_err();
        assert_eq!(err.code(), "2004");
    }

    #[test]
    fn logout_forgets_the_token() {
        let mut store = store();
        let result = store.login(&params("admin", "secret"), fixtures::at()).unwrap();
        assert!(store.logout(&result.token));
        assert!(!store.logout(&result.token));
        assert_eq!(store.session_user_id(&result.token), None);
    }

    #[test]
    fn repeated_logins_keep_only_the_newest_sessions() {
        let mut store = store();
        let tokens: Vec<String> = (0..MAX_SESSIONS_PER_USER + 3)
            .map(|_| store.login(&params("admin", "secret"), fixtures::at()).unwrap().token)
            .collect();

        assert_eq!(store.session_count(), MAX_SESSIONS_PER_USER);
        for token in &tokens[..3] {
            assert_eq!(store.session_user_id(token), None);
        }
        for token in &tokens[3..] {
            assert_eq!(store.session_user_id(token), Some(1));
        }
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
