//! `ipcwatch-forms`: surveillance form schemas.
//!
//! Each submittable form type has an independent schema that turns a loosely
//! typed submission into a normalised, insertable record or the complete
//! list of field errors. Validation is pure: nothing here talks to the
//! remote store.
//!
//! `VAP` appears in the permission tables but has no schema; submitting it
//! yields [`SubmissionError::Unsupported`].

pub mod bundle;
pub mod cauti;
pub mod clabsi;
pub mod error;
pub mod fields;
pub mod mdro;
pub mod record;
pub mod review;
pub mod ssi;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use ipcwatch_core::{FormType, RecordId};

pub use bundle::{
    BundleComplianceSummary, BundleComponents, BundleKey, BundleSubmission, ClabsiBundleEntry,
    DuplicateEntry, Shift,
};
pub use cauti::{CautiReport, CautiSubmission};
pub use clabsi::{ClabsiReport, ClabsiSubmission};
pub use error::{FieldError, SubmissionError, ValidationErrors};
pub use mdro::{MdroReport, MdroSubmission};
pub use record::{ReviewMeta, ReviewStatus, SubmissionContext};
pub use review::{ReviewDecision, ReviewError};
pub use ssi::{SsiReport, SsiSubmission};

/// A submission shape and the record it validates into.
pub trait FormSchema: DeserializeOwned {
    const FORM_TYPE: FormType;
    /// Remote table the record is inserted into.
    const TABLE: &'static str;

    type Record: Serialize + DeserializeOwned;

    fn validate(&self, ctx: &SubmissionContext) -> Result<Self::Record, ValidationErrors>;
}

/// Remote table for a form type, `None` for forms without a schema.
pub fn table_for(form: FormType) -> Option<&'static str> {
    match form {
        FormType::Cauti => Some(CautiSubmission::TABLE),
        FormType::Clabsi => Some(ClabsiSubmission::TABLE),
        FormType::ClabsiBundle => Some(BundleSubmission::TABLE),
        FormType::Mdro => Some(MdroSubmission::TABLE),
        FormType::Ssi => Some(SsiSubmission::TABLE),
        FormType::Vap => None,
    }
}

/// Whether records of this form go through the review workflow.
pub fn is_reviewable(form: FormType) -> bool {
    matches!(
        form,
        FormType::Cauti | FormType::Clabsi | FormType::Mdro | FormType::Ssi
    )
}

/// A validated submission ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub form: FormType,
    pub table: &'static str,
    pub record_id: RecordId,
    pub row: Value,
    /// Set for bundle entries, which must be unique per (patient, date, shift).
    pub bundle_key: Option<BundleKey>,
}

/// Validate a JSON submission for `form`.
pub fn validate_json(
    form: FormType,
    payload: Value,
    ctx: &SubmissionContext,
) -> Result<ValidatedRecord, SubmissionError> {
    match form {
        FormType::Cauti => validate_as::<CautiSubmission>(payload, ctx),
        FormType::Clabsi => validate_as::<ClabsiSubmission>(payload, ctx),
        FormType::Mdro => validate_as::<MdroSubmission>(payload, ctx),
        FormType::Ssi => validate_as::<SsiSubmission>(payload, ctx),
        FormType::ClabsiBundle => {
            let submission = parse::<BundleSubmission>(payload)?;
            let entry = submission.validate(ctx)?;
            let bundle_key = Some(entry.key());
            Ok(ValidatedRecord {
                form,
                table: BundleSubmission::TABLE,
                record_id: entry.id,
                row: to_row(&entry)?,
                bundle_key,
            })
        }
        FormType::Vap => Err(SubmissionError::Unsupported(form)),
    }
}

fn validate_as<S: FormSchema>(
    payload: Value,
    ctx: &SubmissionContext,
) -> Result<ValidatedRecord, SubmissionError> {
    let submission = parse::<S>(payload)?;
    let record = submission.validate(ctx)?;
    tracing::debug!(form = %S::FORM_TYPE, record_id = %ctx.record_id, "submission validated");
    Ok(ValidatedRecord {
        form: S::FORM_TYPE,
        table: S::TABLE,
        record_id: ctx.record_id,
        row: to_row(&record)?,
        bundle_key: None,
    })
}

fn parse<S: DeserializeOwned>(payload: Value) -> Result<S, SubmissionError> {
    if !payload.is_object() {
        return Err(SubmissionError::Malformed(
            "submission must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(payload).map_err(|e| SubmissionError::Malformed(e.to_string()))
}

fn to_row<T: Serialize>(record: &T) -> Result<Value, SubmissionError> {
    serde_json::to_value(record).map_err(|e| SubmissionError::Malformed(e.to_string()))
}
