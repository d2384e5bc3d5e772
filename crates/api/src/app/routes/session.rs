//! Sign-in, sign-out and the caller's own session/profile.
//!
//! Sign-in drives a fresh [`SessionGate`] through identity verification and
//! profile resolution; only a gate that reaches `authenticated_active` is
//! registered. Sign-out ends the local session before the remote call is
//! made, and reports `unauthenticated` whatever the remote outcome.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use ipcwatch_auth::{
    PermissionMatrix, ProfileChanges, SessionGate, SessionState, UserProfile, accessible_forms,
};
use ipcwatch_infra::{RegistryError, SessionRegistry, SessionToken};

use crate::app::dto::{SessionView, SignInRequest, SignInResponse};
use crate::app::{errors, services::AppServices};
use crate::context::SessionContext;

/// Endpoints that take a bearer token whose session may have lost its profile.
pub fn lifecycle_router() -> Router {
    Router::new()
        .route("/session", get(current))
        .route("/session/sign-out", post(sign_out))
        .route("/session/refresh", post(refresh))
}

/// POST /session/sign-in
pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SignInRequest>,
) -> Response {
    let mut gate = SessionGate::new();
    let ticket = match gate.begin_sign_in() {
        Ok(ticket) => ticket,
        Err(e) => return errors::session_error(e),
    };

    let email = body.email.trim().to_lowercase();
    let auth = match services
        .auth
        .sign_in_with_password(&email, &body.password)
        .await
    {
        Ok(auth) => auth,
        Err(e) => {
            if let Ok(state) = gate.identity_failed(ticket, e.to_string()) {
                tracing::info!(state = state.name(), error = %e, "sign-in failed");
            }
            return errors::auth_provider_error(e);
        }
    };

    let rows = match services.profiles.for_identity(auth.auth_user_id).await {
        Ok(rows) => rows,
        Err(e) => {
            if let Ok(state) = gate.profile_lookup_failed(ticket, e.to_string()) {
                tracing::warn!(state = state.name(), error = %e, "profile lookup failed");
            }
            revoke_remote(&services, &auth.access_token).await;
            return errors::store_error(e);
        }
    };

    let state = match gate.resolve_profile(ticket, auth.auth_user_id, rows) {
        Ok(state) => state.clone(),
        Err(e) => return errors::session_error(e),
    };

    let SessionState::AuthenticatedActive { profile } = &state else {
        // Nothing is registered; the remote login is given back straight away.
        revoke_remote(&services, &auth.access_token).await;
        return errors::profile_unavailable(&state);
    };

    let forms = accessible_forms(&services.matrix, Some(profile));
    tracing::info!(
        profile_id = %profile.id,
        role = %profile.role,
        department = %profile.department,
        "signed in"
    );

    let expires_at = auth.window.expires_at;
    let token = match services.sessions.open(gate, auth, Utc::now()) {
        Ok(token) => token,
        Err(e) => return errors::registry_error(e),
    };

    (
        StatusCode::OK,
        Json(SignInResponse {
            token: token.as_str().to_string(),
            expires_at,
            session: state,
            accessible_forms: forms,
        }),
    )
        .into_response()
}

/// POST /session/sign-out
pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<SessionToken>,
) -> Response {
    match services.sessions.close(&token) {
        Ok(ended) => revoke_remote(&services, &ended.access_token).await,
        Err(RegistryError::UnknownSession) => {
            tracing::debug!(session = %token, "sign-out for unknown session");
        }
        Err(e) => tracing::error!(session = %token, error = %e, "could not close session"),
    }

    Json(SessionView {
        session: SessionState::Unauthenticated,
        expires_at: None,
        accessible_forms: Vec::new(),
    })
    .into_response()
}

/// GET /session
///
/// A session that lost its profile is still reported (with its state) so
/// the client can tell the user to contact an administrator.
pub async fn current(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<SessionToken>,
) -> Response {
    match services.sessions.lookup(&token, Utc::now()) {
        Ok(active) => {
            Json(active_view(&services.matrix, active.profile, Some(active.window.expires_at)))
                .into_response()
        }
        Err(RegistryError::ProfileUnavailable(state)) => Json(SessionView {
            session: state,
            expires_at: None,
            accessible_forms: Vec::new(),
        })
        .into_response(),
        Err(e) => errors::registry_error(e),
    }
}

/// POST /session/refresh
///
/// Re-reads the caller's profile. A profile that was deactivated or deleted
/// meanwhile drops the session to `authenticated_no_profile`.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<SessionToken>,
) -> Response {
    let (ticket, target) = match services.sessions.begin_refresh(&token) {
        Ok(started) => started,
        Err(e) => return errors::registry_error(e),
    };

    let fetched = match services.profiles.get(target.profile_id).await {
        Ok(profile) => profile,
        Err(e) => return errors::store_error(e),
    };

    match services.sessions.complete_refresh(&token, ticket, fetched) {
        Ok(SessionState::AuthenticatedActive { profile }) => {
            Json(active_view(&services.matrix, profile, None)).into_response()
        }
        Ok(state) => {
            tracing::info!(session = %token, state = state.name(), "profile no longer usable");
            errors::profile_unavailable(&state)
        }
        Err(e) => errors::registry_error(e),
    }
}

/// PATCH /session/profile
///
/// Owners may change their name and phone only.
pub async fn update_own_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(changes): Json<ProfileChanges>,
) -> Response {
    if changes.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "no changes given");
    }

    let current = match services.profiles.get(ctx.profile_id()).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return errors::not_found("profile not found"),
        Err(e) => return errors::store_error(e),
    };

    let next = match current.apply_changes(&changes, ctx.profile(), Utc::now()) {
        Ok(next) => next,
        Err(e) => return errors::domain_error(e),
    };

    let saved = match services.profiles.save(&next).await {
        Ok(saved) => saved,
        Err(e) => return errors::store_error(e),
    };

    recache(&services.sessions, ctx.token(), saved.clone());
    Json(saved).into_response()
}

fn active_view(
    matrix: &PermissionMatrix,
    profile: UserProfile,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> SessionView {
    let accessible_forms = accessible_forms(matrix, Some(&profile));
    SessionView {
        session: SessionState::AuthenticatedActive { profile },
        expires_at,
        accessible_forms,
    }
}

/// Push an already-saved profile into the caller's cached session.
fn recache(sessions: &SessionRegistry, token: &SessionToken, profile: UserProfile) {
    let outcome = sessions
        .begin_refresh(token)
        .and_then(|(ticket, _)| sessions.complete_refresh(token, ticket, Some(profile)));
    if let Err(e) = outcome {
        tracing::debug!(session = %token, error = %e, "cached profile not updated");
    }
}

async fn revoke_remote(services: &AppServices, access_token: &str) {
    if let Err(e) = services.auth.sign_out(access_token).await {
        tracing::warn!(error = %e, "remote sign-out failed; local session already ended");
    }
}
