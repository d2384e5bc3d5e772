//! Surgical site infection reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ipcwatch_core::{FormType, RecordId, catalogue_enum};

use crate::fields::{
    PatientInfo, PatientSubmission, any_checked, ensure_not_future, optional_text, required_date,
    required_enum, required_text,
};
use crate::{FormSchema, ReviewMeta, SubmissionContext, ValidationErrors};

/// Days after the procedure during which an infection counts as an SSI.
pub const SURVEILLANCE_DAYS: i64 = 30;
/// Extended window when an implant was placed.
pub const IMPLANT_SURVEILLANCE_DAYS: i64 = 90;

catalogue_enum! {
    pub enum WoundClass {
        Clean => "CLEAN",
        CleanContaminated => "CLEAN_CONTAMINATED",
        Contaminated => "CONTAMINATED",
        Dirty => "DIRTY",
    }
}

catalogue_enum! {
    pub enum SsiType {
        Superficial => "SUPERFICIAL",
        Deep => "DEEP",
        OrganSpace => "ORGAN_SPACE",
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsiSymptoms {
    pub purulent_drainage: bool,
    pub pain_tenderness: bool,
    pub localized_swelling: bool,
    pub redness: bool,
    pub heat: bool,
    pub fever: bool,
    pub wound_dehiscence: bool,
}

impl SsiSymptoms {
    pub fn any(&self) -> bool {
        any_checked(&[
            self.purulent_drainage,
            self.pain_tenderness,
            self.localized_swelling,
            self.redness,
            self.heat,
            self.fever,
            self.wound_dehiscence,
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsiLabFindings {
    pub positive_culture: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SsiSubmission {
    #[serde(flatten)]
    pub patient: PatientSubmission,
    pub procedure_name: String,
    pub procedure_date: String,
    pub event_date: String,
    pub wound_class: String,
    pub ssi_type: String,
    pub implant: bool,
    pub symptoms: SsiSymptoms,
    pub lab_findings: SsiLabFindings,
    pub organism: Option<String>,
}

/// A row of `ssi_reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsiReport {
    pub id: RecordId,
    #[serde(flatten)]
    pub patient: PatientInfo,
    pub procedure_name: String,
    pub procedure_date: NaiveDate,
    pub event_date: NaiveDate,
    pub wound_class: WoundClass,
    pub ssi_type: SsiType,
    pub implant: bool,
    pub symptoms: SsiSymptoms,
    pub lab_findings: SsiLabFindings,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(flatten)]
    pub review: ReviewMeta,
}

impl FormSchema for SsiSubmission {
    const FORM_TYPE: FormType = FormType::Ssi;
    const TABLE: &'static str = "ssi_reports";
    type Record = SsiReport;

    fn validate(&self, ctx: &SubmissionContext) -> Result<SsiReport, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient = self.patient.validate(&mut errors);
        let procedure_name = required_text(&mut errors, "procedure_name", &self.procedure_name);
        let procedure = required_date(&mut errors, "procedure_date", &self.procedure_date);
        let event = required_date(&mut errors, "event_date", &self.event_date);
        let wound_class =
            required_enum(&mut errors, "wound_class", &self.wound_class, WoundClass::ALL);
        let ssi_type = required_enum(&mut errors, "ssi_type", &self.ssi_type, SsiType::ALL);

        ensure_not_future(&mut errors, "event_date", event, ctx.submitted_at.date_naive());
        if let (Some(p), Some(e)) = (procedure, event) {
            let window = if self.implant {
                IMPLANT_SURVEILLANCE_DAYS
            } else {
                SURVEILLANCE_DAYS
            };
            let elapsed = (e - p).num_days();
            if elapsed < 0 {
                errors.push("event_date", "cannot be before the procedure date");
            } else if elapsed > window {
                errors.push(
                    "event_date",
                    format!("must be within {window} days of the procedure"),
                );
            }
        }

        if !self.symptoms.any() {
            errors.push("symptoms", "at least one symptom must be selected");
        }

        match (patient, procedure_name, procedure, event, wound_class, ssi_type) {
            (
                Some(patient),
                Some(procedure_name),
                Some(procedure_date),
                Some(event_date),
                Some(wound_class),
                Some(ssi_type),
            ) if errors.is_empty() => Ok(SsiReport {
                id: ctx.record_id,
                patient,
                procedure_name,
                procedure_date,
                event_date,
                wound_class,
                ssi_type,
                implant: self.implant,
                symptoms: self.symptoms,
                lab_findings: self.lab_findings,
                organism: optional_text(&self.organism),
                review: ReviewMeta::pending(ctx),
            }),
            _ => Err(errors),
        }
    }
}
