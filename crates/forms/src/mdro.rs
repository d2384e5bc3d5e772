//! Multidrug-resistant organism reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ipcwatch_core::{FormType, RecordId, catalogue_enum};

use crate::fields::{
    PatientInfo, PatientSubmission, ensure_not_future, optional_text, required_date,
    required_enum,
};
use crate::{FormSchema, ReviewMeta, SubmissionContext, ValidationErrors};

catalogue_enum! {
    pub enum Organism {
        Mrsa => "MRSA",
        Vre => "VRE",
        Cre => "CRE",
        Esbl => "ESBL",
        Crab => "CRAB",
        Crpa => "CRPA",
        CDiff => "C_DIFF",
        Other => "OTHER",
    }
}

catalogue_enum! {
    pub enum SpecimenType {
        Blood => "BLOOD",
        Urine => "URINE",
        Sputum => "SPUTUM",
        Wound => "WOUND",
        Stool => "STOOL",
        RectalSwab => "RECTAL_SWAB",
        Other => "OTHER",
    }
}

catalogue_enum! {
    pub enum Classification {
        Infection => "INFECTION",
        Colonization => "COLONIZATION",
    }
}

catalogue_enum! {
    pub enum Priority {
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MdroSubmission {
    #[serde(flatten)]
    pub patient: PatientSubmission,
    pub specimen_collection_date: String,
    pub organism: String,
    pub organism_other: Option<String>,
    pub specimen_type: String,
    pub classification: String,
    pub priority: String,
    pub isolation_precautions: bool,
}

/// A row of `mdro_reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdroReport {
    pub id: RecordId,
    #[serde(flatten)]
    pub patient: PatientInfo,
    pub specimen_collection_date: NaiveDate,
    pub organism: Organism,
    #[serde(default)]
    pub organism_other: Option<String>,
    pub specimen_type: SpecimenType,
    pub classification: Classification,
    pub priority: Priority,
    pub isolation_precautions: bool,
    #[serde(flatten)]
    pub review: ReviewMeta,
}

impl FormSchema for MdroSubmission {
    const FORM_TYPE: FormType = FormType::Mdro;
    const TABLE: &'static str = "mdro_reports";
    type Record = MdroReport;

    fn validate(&self, ctx: &SubmissionContext) -> Result<MdroReport, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient = self.patient.validate(&mut errors);
        let collected = required_date(
            &mut errors,
            "specimen_collection_date",
            &self.specimen_collection_date,
        );
        ensure_not_future(
            &mut errors,
            "specimen_collection_date",
            collected,
            ctx.submitted_at.date_naive(),
        );
        let organism = required_enum(&mut errors, "organism", &self.organism, Organism::ALL);
        let specimen_type =
            required_enum(&mut errors, "specimen_type", &self.specimen_type, SpecimenType::ALL);
        let classification = required_enum(
            &mut errors,
            "classification",
            &self.classification,
            Classification::ALL,
        );
        let priority = required_enum(&mut errors, "priority", &self.priority, Priority::ALL);

        // The free-text name only means something for OTHER.
        let organism_other = match organism {
            Some(Organism::Other) => {
                let name = optional_text(&self.organism_other);
                if name.is_none() {
                    errors.push("organism_other", "is required when organism is OTHER");
                }
                name
            }
            _ => None,
        };

        match (patient, collected, organism, specimen_type, classification, priority) {
            (
                Some(patient),
                Some(specimen_collection_date),
                Some(organism),
                Some(specimen_type),
                Some(classification),
                Some(priority),
            ) if errors.is_empty() => Ok(MdroReport {
                id: ctx.record_id,
                patient,
                specimen_collection_date,
                organism,
                organism_other,
                specimen_type,
                classification,
                priority,
                isolation_precautions: self.isolation_precautions,
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

    fn base() -> serde_json::Value {
        json!({
            "patient_id": "MRN-3003",
            "patient_name": "Lina Haddad",
            "age": 33,
            "gender": "Female",
            "department": "LABORATORY",
            "specimen_collection_date": "2024-05-30",
            "organism": "MRSA",
            "specimen_type": "WOUND",
            "classification": "COLONIZATION",
            "priority": "HIGH",
            "isolation_precautions": true
        })
    }

    fn validate(v: serde_json::Value) -> Result<MdroReport, ValidationErrors> {
        serde_json::from_value::<MdroSubmission>(v).unwrap().validate(&ctx())
    }

    #[test]
    fn valid_report() {
        let r = validate(base()).unwrap();
        assert_eq!(r.organism, Organism::Mrsa);
        assert_eq!(r.priority, Priority::High);
        assert!(r.isolation_precautions);
        assert!(r.organism_other.is_none());
        let row = serde_json::to_value(&r).unwrap();
        assert_eq!(row["specimen_type"], "WOUND");
    }

    #[test]
    fn other_organism_needs_a_name() {
        let mut v = base();
        v["organism"] = json!("OTHER");
        assert!(validate(v.clone()).unwrap_err().has_field("organism_other"));

        v["organism_other"] = json!("Candida auris");
        let r = validate(v).unwrap();
        assert_eq!(r.organism_other.as_deref(), Some("Candida auris"));
    }

    #[test]
    fn name_is_dropped_for_listed_organisms() {
        let mut v = base();
        v["organism_other"] = json!("ignored");
        assert!(validate(v).unwrap().organism_other.is_none());
    }

    #[test]
    fn priority_must_be_listed() {
        let mut v = base();
        v["priority"] = json!("URGENT");
        let errors = validate(v).unwrap_err();
        let e = errors.errors.iter().find(|e| e.field == "priority").unwrap();
        assert_eq!(e.message, "must be one of: HIGH, MEDIUM, LOW");
    }

    #[test]
    fn all_enumerations_are_required() {
        let errors = validate(json!({})).unwrap_err();
        for field in [
            "specimen_collection_date",
            "organism",
            "specimen_type",
            "classification",
            "priority",
        ] {
            assert!(errors.has_field(field), "expected error on {field}");
        }
    }
}
