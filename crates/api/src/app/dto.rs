use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ipcwatch_auth::{Role, SessionState};
use ipcwatch_core::{Department, FormType};
use ipcwatch_forms::ReviewStatus;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Record listing filters (`GET /forms/:form_type/records`).
#[derive(Debug, Default, Deserialize)]
pub struct RecordListParams {
    pub department: Option<Department>,
    pub review_status: Option<ReviewStatus>,
    pub patient_id: Option<String>,
    /// Only the caller's own submissions.
    #[serde(default)]
    pub mine: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub department: Department,
}

#[derive(Debug, Deserialize)]
pub struct ExplainParams {
    pub role: Role,
    pub department: Department,
    pub form_type: FormType,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session: SessionState,
    pub accessible_forms: Vec<FormType>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub accessible_forms: Vec<FormType>,
}

#[derive(Debug, Serialize)]
pub struct FormSummary {
    pub form_type: FormType,
    /// False for form types that only exist in the permission tables.
    pub accepts_submissions: bool,
    pub reviewable: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleDescription {
    pub role: Role,
    pub description: &'static str,
    pub privileged: bool,
}
