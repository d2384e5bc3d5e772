use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ipcwatch_core::{ProfileId, RecordId};

/// Where a submitted record sits in the IPC review workflow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    RequiresRevision,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::RequiresRevision => "requires_revision",
        }
    }

    /// A decision has been recorded and cannot be replaced.
    pub fn is_final(self) -> bool {
        matches!(self, ReviewStatus::Approved | ReviewStatus::Rejected)
    }
}

impl core::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who submitted the record, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionContext {
    pub record_id: RecordId,
    pub submitted_by: ProfileId,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionContext {
    pub fn new(submitted_by: ProfileId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            record_id: RecordId::new(),
            submitted_by,
            submitted_at,
        }
    }
}

/// Audit columns shared by every surveillance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMeta {
    pub review_status: ReviewStatus,
    pub submitted_by: ProfileId,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_by: Option<ProfileId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_notes: Option<String>,
}

impl ReviewMeta {
    pub fn pending(ctx: &SubmissionContext) -> Self {
        Self {
            review_status: ReviewStatus::Pending,
            submitted_by: ctx.submitted_by,
            submitted_at: ctx.submitted_at,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        }
    }
}
