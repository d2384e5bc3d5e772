//! Review workflow for submitted surveillance records.
//!
//! ```text
//! pending ──► approved
//!    │   ──► rejected
//!    └────► requires_revision ──(resubmit)──► pending
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use ipcwatch_core::ProfileId;

use crate::{ReviewMeta, ReviewStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("a review decision must be approved, rejected or requires_revision")]
    InvalidDecision,

    #[error("record is {0}; only pending records can be reviewed")]
    NotPending(ReviewStatus),

    #[error("record is {0}; only records sent back for revision can be resubmitted")]
    NotAwaitingRevision(ReviewStatus),

    #[error("only the original submitter may resubmit a record")]
    NotSubmitter,
}

/// A reviewer's verdict as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub status: ReviewStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Record a decision on a pending record.
pub fn apply_review(
    meta: &ReviewMeta,
    decision: &ReviewDecision,
    reviewer: ProfileId,
    now: DateTime<Utc>,
) -> Result<ReviewMeta, ReviewError> {
    if decision.status == ReviewStatus::Pending {
        return Err(ReviewError::InvalidDecision);
    }
    if meta.review_status != ReviewStatus::Pending {
        return Err(ReviewError::NotPending(meta.review_status));
    }

    let mut next = meta.clone();
    next.review_status = decision.status;
    next.reviewed_by = Some(reviewer);
    next.reviewed_at = Some(now);
    next.review_notes = decision
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Ok(next)
}

/// Put a record sent back for revision into the queue again.
///
/// Previous reviewer stamps are cleared; notes are kept so the next reviewer
/// can see what was asked for.
pub fn resubmit(
    meta: &ReviewMeta,
    submitter: ProfileId,
    now: DateTime<Utc>,
) -> Result<ReviewMeta, ReviewError> {
    if meta.review_status != ReviewStatus::RequiresRevision {
        return Err(ReviewError::NotAwaitingRevision(meta.review_status));
    }
    if meta.submitted_by != submitter {
        return Err(ReviewError::NotSubmitter);
    }

    let mut next = meta.clone();
    next.review_status = ReviewStatus::Pending;
    next.submitted_at = now;
    next.reviewed_by = None;
    next.reviewed_at = None;
    Ok(next)
}

/// Columns to send in an update-by-id after a review transition.
pub fn review_patch(meta: &ReviewMeta) -> Value {
    json!({
        "review_status": meta.review_status,
        "submitted_at": meta.submitted_at,
        "reviewed_by": meta.reviewed_by,
        "reviewed_at": meta.reviewed_at,
        "review_notes": meta.review_notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubmissionContext;

    fn pending() -> ReviewMeta {
        ReviewMeta::pending(&SubmissionContext::new(ProfileId::new(), Utc::now()))
    }

    fn decide(status: ReviewStatus) -> ReviewDecision {
        ReviewDecision {
            status,
            notes: Some("  checked against lab report ".to_string()),
        }
    }

    #[test]
    fn approve_stamps_reviewer() {
        let reviewer = ProfileId::new();
        let next = apply_review(&pending(), &decide(ReviewStatus::Approved), reviewer, Utc::now())
            .unwrap();
        assert_eq!(next.review_status, ReviewStatus::Approved);
        assert_eq!(next.reviewed_by, Some(reviewer));
        assert!(next.reviewed_at.is_some());
        assert_eq!(next.review_notes.as_deref(), Some("checked against lab report"));
    }

    #[test]
    fn decided_records_cannot_be_decided_again() {
        let approved =
            apply_review(&pending(), &decide(ReviewStatus::Approved), ProfileId::new(), Utc::now())
                .unwrap();
        let err = apply_review(&approved, &decide(ReviewStatus::Rejected), ProfileId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, ReviewError::NotPending(ReviewStatus::Approved));
    }

    #[test]
    fn pending_is_not_a_decision() {
        let err = apply_review(&pending(), &decide(ReviewStatus::Pending), ProfileId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, ReviewError::InvalidDecision);
    }

    #[test]
    fn revision_round_trip_returns_to_pending() {
        let meta = pending();
        let submitter = meta.submitted_by;
        let sent_back = apply_review(
            &meta,
            &decide(ReviewStatus::RequiresRevision),
            ProfileId::new(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            resubmit(&sent_back, ProfileId::new(), Utc::now()).unwrap_err(),
            ReviewError::NotSubmitter
        );

        let again = resubmit(&sent_back, submitter, Utc::now()).unwrap();
        assert_eq!(again.review_status, ReviewStatus::Pending);
        assert!(again.reviewed_by.is_none());
        assert!(again.review_notes.is_some());

        // And it can be reviewed once more.
        assert!(apply_review(&again, &decide(ReviewStatus::Approved), ProfileId::new(), Utc::now()).is_ok());
    }

    #[test]
    fn only_revision_requests_can_be_resubmitted() {
        let meta = pending();
        assert_eq!(
            resubmit(&meta, meta.submitted_by, Utc::now()).unwrap_err(),
            ReviewError::NotAwaitingRevision(ReviewStatus::Pending)
        );
    }

    #[test]
    fn patch_uses_wire_codes() {
        let next = apply_review(
            &pending(),
            &decide(ReviewStatus::RequiresRevision),
            ProfileId::new(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(review_patch(&next)["review_status"], "requires_revision");
    }
}
