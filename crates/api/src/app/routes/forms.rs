//! Surveillance form submission, listing and review.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;

use ipcwatch_auth::accessible_forms;
use ipcwatch_core::{FormType, RecordId};
use ipcwatch_forms::review::{apply_review, resubmit};
use ipcwatch_forms::{ReviewDecision, SubmissionContext, is_reviewable, table_for, validate_json};
use ipcwatch_infra::RecordQuery;
use ipcwatch_infra::records::review_meta;
use ipcwatch_infra::store::cell_text;

use crate::app::dto::{FormSummary, RecordListParams};
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_forms))
        .route("/:form_type", post(submit))
        .route("/:form_type/records", get(list_records))
        .route("/:form_type/records/:id", get(get_record))
        .route("/:form_type/records/:id/review", post(review))
        .route("/:form_type/records/:id/resubmit", post(resubmit_record))
}

fn parse_form(raw: &str) -> Result<FormType, Response> {
    raw.parse::<FormType>().map_err(|_| {
        errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_form",
            format!("unknown form type '{raw}'"),
        )
    })
}

fn parse_record_id(raw: &str) -> Result<RecordId, Response> {
    raw.parse::<RecordId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid record id"))
}

/// Load a record the caller may see. Rows from other departments are
/// reported as missing to non-privileged callers.
async fn load_visible(
    services: &AppServices,
    ctx: &SessionContext,
    form: FormType,
    id: RecordId,
) -> Result<Value, Response> {
    let row = services
        .records
        .get(form, id)
        .await
        .map_err(errors::record_error)?
        .ok_or_else(|| errors::not_found(format!("no {form} record {id}")))?;

    if !authz::sees_all_departments(ctx)
        && cell_text(&row["department"]).as_deref() != Some(ctx.department().as_str())
    {
        return Err(errors::not_found(format!("no {form} record {id}")));
    }
    Ok(row)
}

/// GET /forms - form types the caller may open
pub async fn list_forms(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
) -> Response {
    let forms: Vec<FormSummary> = accessible_forms(&services.matrix, Some(ctx.profile()))
        .into_iter()
        .map(|form_type| FormSummary {
            form_type,
            accepts_submissions: table_for(form_type).is_some(),
            reviewable: is_reviewable(form_type),
        })
        .collect();
    Json(forms).into_response()
}

/// POST /forms/:form_type - validate and store a submission
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(form_type): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let form = match parse_form(&form_type) {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_form_access(&services.matrix, &ctx, form) {
        return resp;
    }

    let submission = SubmissionContext::new(ctx.profile_id(), Utc::now());
    let record = match validate_json(form, payload, &submission) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(form = %form, error = %e, "submission rejected");
            return errors::submission_error(e);
        }
    };

    match services.records.insert(&record).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => errors::record_error(e),
    }
}

/// GET /forms/:form_type/records
pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(form_type): Path<String>,
    Query(params): Query<RecordListParams>,
) -> Response {
    let form = match parse_form(&form_type) {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::require_form_access(&services.matrix, &ctx, form) {
        return resp;
    }

    let department = if authz::sees_all_departments(&ctx) {
        params.department
    } else {
        match params.department {
            Some(d) if d != ctx.department() => {
                return errors::json_error(
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    format!("records of department {d} are not visible to you"),
                );
            }
            _ => Some(ctx.department()),
        }
    };

    let query = RecordQuery {
        department,
        review_status: params.review_status,
        submitted_by: params.mine.then(|| ctx.profile_id()),
        patient_id: params.patient_id,
        limit: params.limit,
    };

    match services.records.list(form, &query).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::record_error(e),
    }
}

/// GET /forms/:form_type/records/:id
pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((form_type, id)): Path<(String, String)>,
) -> Response {
    let (form, id) = match (parse_form(&form_type), parse_record_id(&id)) {
        (Ok(form), Ok(id)) => (form, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    if let Err(resp) = authz::require_form_access(&services.matrix, &ctx, form) {
        return resp;
    }

    match load_visible(&services, &ctx, form, id).await {
        Ok(row) => Json(row).into_response(),
        Err(resp) => resp,
    }
}

/// POST /forms/:form_type/records/:id/review - approve, reject or send back
pub async fn review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((form_type, id)): Path<(String, String)>,
    Json(decision): Json<ReviewDecision>,
) -> Response {
    let (form, id) = match (parse_form(&form_type), parse_record_id(&id)) {
        (Ok(form), Ok(id)) => (form, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    if !is_reviewable(form) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "not_reviewable",
            format!("{form} records have no review workflow"),
        );
    }
    if let Err(resp) = authz::require_reviewer(&ctx) {
        return resp;
    }

    let row = match load_visible(&services, &ctx, form, id).await {
        Ok(row) => row,
        Err(resp) => return resp,
    };
    let meta = match review_meta(&row) {
        Ok(meta) => meta,
        Err(e) => return errors::store_error(e),
    };
    let next = match apply_review(&meta, &decision, ctx.profile_id(), Utc::now()) {
        Ok(next) => next,
        Err(e) => return errors::review_error(e),
    };

    match services.records.save_review(form, id, &next).await {
        Ok(row) => {
            tracing::info!(
                form = %form,
                record_id = %id,
                reviewer = %ctx.profile_id(),
                status = %next.review_status,
                "record reviewed"
            );
            Json(row).into_response()
        }
        Err(e) => errors::record_error(e),
    }
}

/// POST /forms/:form_type/records/:id/resubmit - submitter sends a corrected
/// version of a record that was sent back for revision
///
/// The body is a full submission for the form. It is validated like a new
/// one and replaces the record's data; id and submitter are kept.
pub async fn resubmit_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((form_type, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Response {
    let (form, id) = match (parse_form(&form_type), parse_record_id(&id)) {
        (Ok(form), Ok(id)) => (form, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    if !is_reviewable(form) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "not_reviewable",
            format!("{form} records have no review workflow"),
        );
    }
    if let Err(resp) = authz::require_form_access(&services.matrix, &ctx, form) {
        return resp;
    }

    let row = match load_visible(&services, &ctx, form, id).await {
        Ok(row) => row,
        Err(resp) => return resp,
    };
    let meta = match review_meta(&row) {
        Ok(meta) => meta,
        Err(e) => return errors::store_error(e),
    };
    let next = match resubmit(&meta, ctx.profile_id(), Utc::now()) {
        Ok(next) => next,
        Err(e) => return errors::review_error(e),
    };

    let correction = SubmissionContext {
        record_id: id,
        submitted_by: next.submitted_by,
        submitted_at: next.submitted_at,
    };
    let record = match validate_json(form, payload, &correction) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(form = %form, record_id = %id, error = %e, "revision rejected");
            return errors::submission_error(e);
        }
    };

    match services.records.save_revision(&record, &next).await {
        Ok(row) => Json(row).into_response(),
        Err(e) => errors::record_error(e),
    }
}
