use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use metasoft_core::UserId;

use crate::context::UserContext;

/// Token-to-user session table.
///
/// Identity lives with the platform; the API only resolves an opaque bearer
/// token to the `UserId` it was issued for.
#[derive(Clone, Default)]
pub struct SessionStore {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the session table from `METASOFT_API_TOKENS`, a comma-separated
    /// list of `token=user-uuid` pairs.
    ///
    /// With no tokens configured, a single `dev-token` session is issued so
    /// local runs work out of the box.
    pub fn from_env() -> Self {
        let sessions = Self::new();

        let raw = std::env::var("METASOFT_API_TOKENS").unwrap_or_default();
        for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let Some((token, user)) = pair.split_once('=') else {
                tracing::warn!("ignoring malformed METASOFT_API_TOKENS entry");
                continue;
            };
            match user.trim().parse::<UserId>() {
                Ok(user_id) => sessions.issue(token.trim(), user_id),
                Err(_) => tracing::warn!("ignoring METASOFT_API_TOKENS entry with invalid user id"),
            }
        }

        if sessions.is_empty() {
            let dev_user = UserId::new();
            tracing::warn!(user_id = %dev_user, "METASOFT_API_TOKENS not set; issuing dev-token");
            sessions.issue("dev-token", dev_user);
        }

        sessions
    }

    // A poisoned table can only follow a panic elsewhere; treat it as
    // holding no sessions so requests are denied instead of unwinding.
    pub fn issue(&self, token: impl Into<String>, user_id: UserId) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.into(), user_id);
        } else {
            tracing::warn!("session table poisoned; dropping issued session");
        }
    }

    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.read().ok()?.get(token).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().map(|t| t.is_empty()).unwrap_or(true)
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionStore,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let user_id = state
        .sessions
        .resolve(token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(UserContext::new(user_id));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
