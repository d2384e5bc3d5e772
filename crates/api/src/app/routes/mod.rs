use axum::{Router, routing::patch};

pub mod admin;
pub mod analytics;
pub mod bundles;
pub mod forms;
pub mod session;
pub mod system;

/// Router for all endpoints that need an active profile.
pub fn router() -> Router {
    Router::new()
        .route("/session/profile", patch(session::update_own_profile))
        .nest("/forms", forms::router())
        .nest("/bundles", bundles::router())
        .nest("/analytics", analytics::router())
        .nest("/admin", admin::router())
}
