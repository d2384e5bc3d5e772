use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use ipcwatch_infra::{SessionRegistry, SessionToken};

use crate::app::errors;
use crate::context::SessionContext;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionRegistry>,
}

/// Resolve the bearer token to an active session and attach a
/// [`SessionContext`]. Unknown or expired sessions get 401; a session whose
/// profile went away gets 403 `profile_unavailable`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => SessionToken::from(token),
        Err(status) => return errors::unauthenticated(status),
    };

    match state.sessions.lookup(&token, Utc::now()) {
        Ok(session) => {
            req.extensions_mut().insert(SessionContext::from(session));
            next.run(req).await
        }
        Err(e) => errors::registry_error(e),
    }
}

/// Attach the raw [`SessionToken`] without resolving it.
///
/// Used by the session endpoints that must keep working when the session
/// has no usable profile (sign-out, state inspection, refresh).
pub async fn bearer_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => SessionToken::from(token),
        Err(status) => return errors::unauthenticated(status),
    };
    req.extensions_mut().insert(token);
    next.run(req).await
}

pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
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
