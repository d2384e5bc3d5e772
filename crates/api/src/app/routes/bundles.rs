use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
};

use ipcwatch_core::FormType;
use ipcwatch_forms::bundle::summarize;

use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route("/:patient_id/compliance", get(compliance))
}

/// GET /bundles/:patient_id/compliance - per-shift history and averages
pub async fn compliance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(patient_id): Path<String>,
) -> Response {
    if let Err(resp) = authz::require_form_access(&services.matrix, &ctx, FormType::ClabsiBundle) {
        return resp;
    }

    let patient_id = patient_id.trim();
    let mut entries = match services.records.bundle_entries(patient_id).await {
        Ok(entries) => entries,
        Err(e) => return errors::record_error(e),
    };
    // Same department scoping as record listings.
    if !authz::sees_all_departments(&ctx) {
        entries.retain(|e| e.department == ctx.department());
    }
    Json(summarize(patient_id, &entries)).into_response()
}
