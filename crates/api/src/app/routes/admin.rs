//! Administrator routes: account management and the permission matrix.
//!
//! Every handler requires the `ADMIN` role. Role, department and active
//! status can never be changed on the caller's own profile.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use ipcwatch_auth::{NewProfile, ProfileChanges, Role, UserProfile, explain_access};
use ipcwatch_core::{AuthUserId, ProfileId};

use crate::app::dto::{CreateUserRequest, ExplainParams, RoleDescription};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::SessionContext;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/permissions", get(permissions))
        .route("/permissions/explain", get(explain))
}

fn parse_profile_id(raw: &str) -> Result<ProfileId, Response> {
    raw.parse::<ProfileId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid profile id"))
}

async fn load_profile(services: &AppServices, id: ProfileId) -> Result<UserProfile, Response> {
    services
        .profiles
        .get(id)
        .await
        .map_err(errors::store_error)?
        .ok_or_else(|| errors::not_found(format!("no profile {id}")))
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    match services.profiles.list().await {
        Ok(profiles) => Json(profiles).into_response(),
        Err(e) => errors::store_error(e),
    }
}

/// POST /admin/users - create the login identity, then its profile
///
/// If the profile cannot be stored the fresh identity is deleted again.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    let now = Utc::now();
    // Validate the profile fields before anything is created remotely.
    let draft = match UserProfile::create(
        NewProfile {
            auth_user_id: AuthUserId::new(),
            full_name: body.full_name,
            email: body.email,
            phone: body.phone,
            role: body.role,
            department: body.department,
        },
        ProfileId::new(),
        now,
    ) {
        Ok(draft) => draft,
        Err(e) => return errors::domain_error(e),
    };

    let auth_user_id = match services.auth.create_user(&draft.email, &body.password).await {
        Ok(id) => id,
        Err(e) => return errors::auth_provider_error(e),
    };

    let profile = UserProfile {
        auth_user_id,
        ..draft
    };
    match services.profiles.insert(&profile).await {
        Ok(saved) => {
            tracing::info!(
                actor = %ctx.profile_id(),
                profile_id = %saved.id,
                role = %saved.role,
                department = %saved.department,
                "user created"
            );
            (StatusCode::CREATED, Json(saved)).into_response()
        }
        Err(e) => {
            if let Err(cleanup) = services.auth.delete_user(auth_user_id).await {
                tracing::error!(
                    %auth_user_id,
                    error = %cleanup,
                    "orphaned login identity after failed profile insert"
                );
            }
            errors::store_error(e)
        }
    }
}

/// GET /admin/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    let id = match parse_profile_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match load_profile(&services, id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(resp) => resp,
    }
}

/// PATCH /admin/users/:id
///
/// Changing role, department or active status ends the target's live
/// sessions so the new values apply from their next sign-in.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(changes): Json<ProfileChanges>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    let id = match parse_profile_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if changes.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "no changes given");
    }

    let current = match load_profile(&services, id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };
    let next = match current.apply_changes(&changes, ctx.profile(), Utc::now()) {
        Ok(next) => next,
        Err(e) => return errors::domain_error(e),
    };
    let saved = match services.profiles.save(&next).await {
        Ok(saved) => saved,
        Err(e) => return errors::store_error(e),
    };

    if changes.touches_privileged_fields() {
        let closed = services.sessions.close_for_identity(saved.auth_user_id);
        tracing::info!(
            actor = %ctx.profile_id(),
            profile_id = %saved.id,
            role = %saved.role,
            department = %saved.department,
            active = saved.active,
            sessions_closed = closed,
            "user access changed"
        );
    }
    Json(saved).into_response()
}

/// DELETE /admin/users/:id - remove the login identity and its profile
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    let id = match parse_profile_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if id == ctx.profile_id() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "administrators cannot delete their own account",
        );
    }

    let profile = match load_profile(&services, id).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };
    // Profile first: a leftover identity without a profile grants nothing.
    if let Err(e) = services.profiles.delete(id).await {
        return errors::store_error(e);
    }
    let closed = services.sessions.close_for_identity(profile.auth_user_id);
    if let Err(e) = services.auth.delete_user(profile.auth_user_id).await {
        tracing::error!(
            auth_user_id = %profile.auth_user_id,
            error = %e,
            "orphaned login identity after profile delete"
        );
    }

    tracing::info!(
        actor = %ctx.profile_id(),
        profile_id = %id,
        sessions_closed = closed,
        "user deleted"
    );
    StatusCode::NO_CONTENT.into_response()
}

/// GET /admin/permissions - the role and department grant tables
pub async fn permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    let roles: Vec<RoleDescription> = Role::ALL
        .iter()
        .map(|role| RoleDescription {
            role: *role,
            description: role.description(),
            privileged: role.is_privileged(),
        })
        .collect();
    Json(json!({
        "matrix": services.matrix.to_table(),
        "roles": roles,
    }))
    .into_response()
}

/// GET /admin/permissions/explain?role&department&form_type
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Query(params): Query<ExplainParams>,
) -> Response {
    if let Err(resp) = authz::require_admin(&ctx) {
        return resp;
    }
    Json(explain_access(
        &services.matrix,
        params.role,
        params.department,
        params.form_type,
    ))
    .into_response()
}
