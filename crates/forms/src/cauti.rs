//! Catheter-associated urinary tract infection reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ipcwatch_core::{FormType, RecordId};

use crate::fields::{
    PatientInfo, PatientSubmission, any_checked, ensure_not_after, ensure_not_future,
    optional_text, required_date,
};
use crate::{FormSchema, ReviewMeta, SubmissionContext, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CautiSymptoms {
    pub fever: bool,
    pub suprapubic_tenderness: bool,
    pub costovertebral_angle_pain: bool,
    pub urgency: bool,
    pub frequency: bool,
    pub dysuria: bool,
}

impl CautiSymptoms {
    pub fn any(&self) -> bool {
        any_checked(&[
            self.fever,
            self.suprapubic_tenderness,
            self.costovertebral_angle_pain,
            self.urgency,
            self.frequency,
            self.dysuria,
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CautiLabFindings {
    pub positive_urine_culture: bool,
    pub pyuria: bool,
    pub nitrite_positive: bool,
}

impl CautiLabFindings {
    pub fn any(&self) -> bool {
        any_checked(&[self.positive_urine_culture, self.pyuria, self.nitrite_positive])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CautiSubmission {
    #[serde(flatten)]
    pub patient: PatientSubmission,
    pub admission_date: String,
    pub catheter_insertion_date: String,
    pub event_date: String,
    pub symptoms: CautiSymptoms,
    pub lab_findings: CautiLabFindings,
    pub organism: Option<String>,
    pub colony_count: Option<String>,
}

/// A row of `cauti_reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CautiReport {
    pub id: RecordId,
    #[serde(flatten)]
    pub patient: PatientInfo,
    pub admission_date: NaiveDate,
    pub catheter_insertion_date: NaiveDate,
    pub event_date: NaiveDate,
    pub symptoms: CautiSymptoms,
    pub lab_findings: CautiLabFindings,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub colony_count: Option<String>,
    #[serde(flatten)]
    pub review: ReviewMeta,
}

impl FormSchema for CautiSubmission {
    const FORM_TYPE: FormType = FormType::Cauti;
    const TABLE: &'static str = "cauti_reports";
    type Record = CautiReport;

    fn validate(&self, ctx: &SubmissionContext) -> Result<CautiReport, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient = self.patient.validate(&mut errors);
        let admission = required_date(&mut errors, "admission_date", &self.admission_date);
        let insertion = required_date(
            &mut errors,
            "catheter_insertion_date",
            &self.catheter_insertion_date,
        );
        let event = required_date(&mut errors, "event_date", &self.event_date);

        ensure_not_after(&mut errors, "admission_date", admission, event, "event date");
        ensure_not_after(&mut errors, "catheter_insertion_date", insertion, event, "event date");
        ensure_not_future(&mut errors, "event_date", event, ctx.submitted_at.date_naive());

        if !self.symptoms.any() {
            errors.push("symptoms", "at least one symptom must be selected");
        }
        if !self.lab_findings.any() {
            errors.push("lab_findings", "at least one lab finding must be selected");
        }

        match (patient, admission, insertion, event) {
            (Some(patient), Some(admission_date), Some(catheter_insertion_date), Some(event_date))
                if errors.is_empty() =>
            {
                Ok(CautiReport {
                    id: ctx.record_id,
                    patient,
                    admission_date,
                    catheter_insertion_date,
                    event_date,
                    symptoms: self.symptoms,
                    lab_findings: self.lab_findings,
                    organism: optional_text(&self.organism),
                    colony_count: optional_text(&self.colony_count),
                    review: ReviewMeta::pending(ctx),
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReviewStatus;
    use chrono::{TimeZone, Utc};
    use ipcwatch_core::ProfileId;
    use serde_json::json;

    fn ctx() -> SubmissionContext {
        SubmissionContext::new(
            ProfileId::new(),
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        )
    }

    fn valid() -> serde_json::Value {
        json!({
            "patient_id": "MRN-1001",
            "patient_name": "Grace Okafor",
            "age": "67",
            "gender": "Female",
            "department": "ICU",
            "admission_date": "2024-05-20",
            "catheter_insertion_date": "2024-05-21",
            "event_date": "2024-05-25",
            "symptoms": { "fever": true },
            "lab_findings": { "positive_urine_culture": true },
            "organism": "E. coli"
        })
    }

    fn parse(value: serde_json::Value) -> CautiSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_submission_becomes_pending_record() {
        let c = ctx();
        let record = parse(valid()).validate(&c).unwrap();
        assert_eq!(record.id, c.record_id);
        assert_eq!(record.patient.age, 67);
        assert_eq!(record.review.review_status, ReviewStatus::Pending);
        assert_eq!(record.review.submitted_by, c.submitted_by);
        assert_eq!(record.organism.as_deref(), Some("E. coli"));

        let row = serde_json::to_value(&record).unwrap();
        assert_eq!(row["patient_id"], "MRN-1001");
        assert_eq!(row["review_status"], "pending");
        assert_eq!(row["symptoms"]["fever"], true);
    }

    #[test]
    fn no_symptoms_is_rejected_regardless_of_other_fields() {
        let mut v = valid();
        v["symptoms"] = json!({});
        let errors = parse(v).validate(&ctx()).unwrap_err();
        assert_eq!(errors.errors.len(), 1);
        assert!(errors.has_field("symptoms"));

        // Still reported alongside unrelated problems.
        let errors = parse(json!({ "symptoms": {} })).validate(&ctx()).unwrap_err();
        assert!(errors.has_field("symptoms"));
        assert!(errors.has_field("patient_id"));
    }

    #[test]
    fn no_lab_finding_is_rejected_independently() {
        let mut v = valid();
        v["lab_findings"] = json!({ "pyuria": false });
        let errors = parse(v).validate(&ctx()).unwrap_err();
        assert!(errors.has_field("lab_findings"));
        assert!(!errors.has_field("symptoms"));
    }

    #[test]
    fn insertion_after_event_is_rejected() {
        let mut v = valid();
        v["catheter_insertion_date"] = json!("2024-05-26");
        let errors = parse(v).validate(&ctx()).unwrap_err();
        assert!(errors.has_field("catheter_insertion_date"));
    }

    #[test]
    fn future_event_is_rejected() {
        let mut v = valid();
        v["event_date"] = json!("2024-07-01");
        let errors = parse(v).validate(&ctx()).unwrap_err();
        assert!(errors.has_field("event_date"));
    }

    #[test]
    fn malformed_age_becomes_zero() {
        let mut v = valid();
        v["age"] = json!("unknown");
        let record = parse(v).validate(&ctx()).unwrap();
        assert_eq!(record.patient.age, 0);
    }
}
