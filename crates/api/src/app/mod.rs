//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: remote adapters, repositories, session registry
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        sessions: services.sessions.clone(),
    };

    // Protected routes: require a session with an active profile.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Session lifecycle: bearer token only, profile may be gone.
    let session = routes::session::lifecycle_router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn(middleware::bearer_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/session/sign-in",
            post(routes::session::sign_in).layer(Extension(services)),
        )
        .merge(session)
        .merge(protected)
        .layer(ServiceBuilder::new())
}
