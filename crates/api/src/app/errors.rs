use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ipcwatch_auth::{SessionError, SessionState};
use ipcwatch_core::DomainError;
use ipcwatch_forms::{ReviewError, SubmissionError, ValidationErrors};
use ipcwatch_infra::{AnalyticsError, AuthProviderError, RecordError, RegistryError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn unauthenticated(status: StatusCode) -> axum::response::Response {
    json_error(status, "unauthenticated", "missing or invalid session token")
}

pub fn not_found(what: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", what)
}

/// 400 with one entry per offending field.
pub fn validation_error(errors: &ValidationErrors) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "fields": errors.errors,
        })),
    )
        .into_response()
}

/// 403 for a signed-in identity without an active profile.
pub fn profile_unavailable(state: &SessionState) -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({
            "error": "profile_unavailable",
            "message": "no active profile is linked to this account; contact an administrator",
            "session": state,
        })),
    )
        .into_response()
}

pub fn submission_error(err: SubmissionError) -> axum::response::Response {
    match err {
        SubmissionError::Invalid(errors) => validation_error(&errors),
        SubmissionError::Malformed(msg) => {
            json_error(StatusCode::BAD_REQUEST, "malformed_submission", msg)
        }
        e @ SubmissionError::Unsupported(_) => {
            json_error(StatusCode::BAD_REQUEST, "unsupported_form", e.to_string())
        }
    }
}

pub fn store_error(err: StoreError) -> axum::response::Response {
    match err {
        e @ StoreError::NotFound { .. } => not_found(e.to_string()),
        e => {
            tracing::warn!(error = %e, "remote store call failed");
            json_error(StatusCode::BAD_GATEWAY, "remote_error", e.to_string())
        }
    }
}

pub fn record_error(err: RecordError) -> axum::response::Response {
    match err {
        e @ RecordError::Unsupported(_) => {
            json_error(StatusCode::BAD_REQUEST, "unsupported_form", e.to_string())
        }
        RecordError::Duplicate(e) => json_error(StatusCode::CONFLICT, "duplicate_entry", e.to_string()),
        RecordError::Store(e) => store_error(e),
    }
}

pub fn review_error(err: ReviewError) -> axum::response::Response {
    match err {
        e @ ReviewError::InvalidDecision => {
            json_error(StatusCode::BAD_REQUEST, "invalid_decision", e.to_string())
        }
        e @ ReviewError::NotSubmitter => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        e => json_error(StatusCode::CONFLICT, "invalid_transition", e.to_string()),
    }
}

pub fn auth_provider_error(err: AuthProviderError) -> axum::response::Response {
    match err {
        e @ AuthProviderError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", e.to_string())
        }
        e @ AuthProviderError::AlreadyRegistered(_) => {
            json_error(StatusCode::CONFLICT, "already_registered", e.to_string())
        }
        e => {
            tracing::warn!(error = %e, "auth service call failed");
            json_error(StatusCode::BAD_GATEWAY, "remote_error", e.to_string())
        }
    }
}

pub fn analytics_error(err: AnalyticsError) -> axum::response::Response {
    match err {
        AnalyticsError::Store(e) => store_error(e),
        e => json_error(StatusCode::BAD_REQUEST, "invalid_analytics_request", e.to_string()),
    }
}

pub fn domain_error(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::Unauthorized(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
    }
}

pub fn session_error(err: SessionError) -> axum::response::Response {
    json_error(StatusCode::CONFLICT, "session_conflict", err.to_string())
}

pub fn registry_error(err: RegistryError) -> axum::response::Response {
    match err {
        RegistryError::UnknownSession | RegistryError::Expired => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string())
        }
        RegistryError::ProfileUnavailable(state) => profile_unavailable(&state),
        RegistryError::Gate(e) => session_error(e),
        RegistryError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            err.to_string(),
        ),
    }
}
