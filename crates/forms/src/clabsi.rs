//! Central line-associated bloodstream infection reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ipcwatch_core::{FormType, RecordId, catalogue_enum};

use crate::fields::{
    PatientInfo, PatientSubmission, any_checked, ensure_not_after, ensure_not_future,
    optional_text, required_date, required_enum,
};
use crate::{FormSchema, ReviewMeta, SubmissionContext, ValidationErrors};

catalogue_enum! {
    pub enum LineType {
        Cvc => "CVC",
        Picc => "PICC",
        Port => "PORT",
        Hemodialysis => "HEMODIALYSIS",
        Umbilical => "UMBILICAL",
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClabsiSymptoms {
    pub fever: bool,
    pub chills: bool,
    pub hypotension: bool,
    pub apnea: bool,
    pub bradycardia: bool,
    pub hypothermia: bool,
}

impl ClabsiSymptoms {
    pub fn any(&self) -> bool {
        any_checked(&[
            self.fever,
            self.chills,
            self.hypotension,
            self.apnea,
            self.bradycardia,
            self.hypothermia,
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClabsiLabFindings {
    pub recognized_pathogen: bool,
    pub common_commensal: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClabsiSubmission {
    #[serde(flatten)]
    pub patient: PatientSubmission,
    pub admission_date: String,
    pub line_insertion_date: String,
    pub event_date: String,
    pub line_type: String,
    pub symptoms: ClabsiSymptoms,
    pub lab_findings: ClabsiLabFindings,
    pub organism: Option<String>,
}

/// A row of `clabsi_reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClabsiReport {
    pub id: RecordId,
    #[serde(flatten)]
    pub patient: PatientInfo,
    pub admission_date: NaiveDate,
    pub line_insertion_date: NaiveDate,
    pub event_date: NaiveDate,
    pub line_type: LineType,
    pub symptoms: ClabsiSymptoms,
    pub lab_findings: ClabsiLabFindings,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(flatten)]
    pub review: ReviewMeta,
}

impl FormSchema for ClabsiSubmission {
    const FORM_TYPE: FormType = FormType::Clabsi;
    const TABLE: &'static str = "clabsi_reports";
    type Record = ClabsiReport;

    fn validate(&self, ctx: &SubmissionContext) -> Result<ClabsiReport, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient = self.patient.validate(&mut errors);
        let admission = required_date(&mut errors, "admission_date", &self.admission_date);
        let insertion = required_date(&mut errors, "line_insertion_date", &self.line_insertion_date);
        let event = required_date(&mut errors, "event_date", &self.event_date);
        let line_type = required_enum(&mut errors, "line_type", &self.line_type, LineType::ALL);

        ensure_not_after(&mut errors, "line_insertion_date", insertion, event, "event date");
        ensure_not_future(&mut errors, "event_date", event, ctx.submitted_at.date_naive());

        let labs = self.lab_findings;
        if !labs.recognized_pathogen && !labs.common_commensal {
            errors.push("lab_findings", "at least one lab finding must be selected");
        } else if labs.common_commensal && !labs.recognized_pathogen && !self.symptoms.any() {
            errors.push(
                "symptoms",
                "a common commensal requires at least one clinical symptom",
            );
        }

        match (patient, admission, insertion, event, line_type) {
            (
                Some(patient),
                Some(admission_date),
                Some(line_insertion_date),
                Some(event_date),
                Some(line_type),
            ) if errors.is_empty() => Ok(ClabsiReport {
                id: ctx.record_id,
                patient,
                admission_date,
                line_insertion_date,
                event_date,
                line_type,
                symptoms: self.symptoms,
                lab_findings: labs,
                organism: optional_text(&self.organism),
                review: ReviewMeta::pending(ctx),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ipcwatch_core::ProfileId;
    use serde_json::json;

    fn ctx() -> SubmissionContext {
        SubmissionContext::new(
            ProfileId::new(),
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        )
    }

    fn submission(lab_findings: serde_json::Value, symptoms: serde_json::Value) -> ClabsiSubmission {
        serde_json::from_value(json!({
            "patient_id": "MRN-2002",
            "patient_name": "Samuel Bello",
            "age": 54,
            "gender": "Male",
            "department": "CCU",
            "admission_date": "2024-05-01",
            "line_insertion_date": "2024-05-02",
            "event_date": "2024-05-10",
            "line_type": "picc",
            "symptoms": symptoms,
            "lab_findings": lab_findings,
        }))
        .unwrap()
    }

    #[test]
    fn recognized_pathogen_alone_is_enough() {
        let record = submission(json!({ "recognized_pathogen": true }), json!({}))
            .validate(&ctx())
            .unwrap();
        assert_eq!(record.line_type, LineType::Picc);
    }

    #[test]
    fn commensal_needs_a_symptom() {
        let errors = submission(json!({ "common_commensal": true }), json!({}))
            .validate(&ctx())
            .unwrap_err();
        assert!(errors.has_field("symptoms"));

        assert!(
            submission(json!({ "common_commensal": true }), json!({ "fever": true }))
                .validate(&ctx())
                .is_ok()
        );
    }

    #[test]
    fn at_least_one_lab_finding() {
        let errors = submission(json!({}), json!({ "fever": true }))
            .validate(&ctx())
            .unwrap_err();
        assert!(errors.has_field("lab_findings"));
    }

    #[test]
    fn unknown_line_type_lists_choices() {
        let mut sub = submission(json!({ "recognized_pathogen": true }), json!({}));
        sub.line_type = "arterial".to_string();
        let errors = sub.validate(&ctx()).unwrap_err();
        let e = errors.errors.iter().find(|e| e.field == "line_type").unwrap();
        assert!(e.message.contains("CVC, PICC, PORT, HEMODIALYSIS, UMBILICAL"));
    }

    #[test]
    fn insertion_after_event_is_rejected() {
        let mut sub = submission(json!({ "recognized_pathogen": true }), json!({}));
        sub.line_insertion_date = "2024-05-11".to_string();
        assert!(sub.validate(&ctx()).unwrap_err().has_field("line_insertion_date"));
    }
}
