//! Request-level authorization guards.
//!
//! Thin wrappers over the pure resolver in `ipcwatch-auth`, turning a
//! denial into the API's `403 forbidden` response.

use axum::http::StatusCode;
use axum::response::Response;

use ipcwatch_auth::{
    AccessError, PermissionMatrix, authorize_form, can_manage_users, can_review_records,
};
use ipcwatch_core::FormType;

use crate::app::errors;
use crate::context::SessionContext;

pub fn require_form_access(
    matrix: &PermissionMatrix,
    ctx: &SessionContext,
    form: FormType,
) -> Result<(), Response> {
    authorize_form(matrix, Some(ctx.profile()), form).map_err(|e| {
        tracing::info!(
            profile_id = %ctx.profile_id(),
            role = %ctx.role(),
            department = %ctx.department(),
            form = %form,
            "form access denied"
        );
        forbidden(e)
    })
}

pub fn require_reviewer(ctx: &SessionContext) -> Result<(), Response> {
    if can_review_records(Some(ctx.profile())) {
        Ok(())
    } else {
        Err(forbidden(AccessError::NotReviewer))
    }
}

pub fn require_admin(ctx: &SessionContext) -> Result<(), Response> {
    if can_manage_users(Some(ctx.profile())) {
        Ok(())
    } else {
        Err(forbidden(AccessError::NotAdministrator))
    }
}

/// Privileged callers see every department's records.
pub fn sees_all_departments(ctx: &SessionContext) -> bool {
    ctx.role().is_privileged()
}

fn forbidden(e: AccessError) -> Response {
    errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
}
