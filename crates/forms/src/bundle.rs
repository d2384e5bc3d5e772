//! CLABSI prevention bundle: one checklist per (patient, date, shift).
//!
//! # Compliance
//! - `day_number = |entry_date - admission_date| + 1` (whole days).
//! - Skin preparation is only scored on day 1, so the denominator is 5 on
//!   day 1 and 4 afterwards.
//! - `compliance = round(100 * completed / denominator)`.
//!
//! Uniqueness of the (patient, date, shift) triple is checked against the
//! patient's already loaded entries before anything is inserted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ipcwatch_core::{Department, FormType, ProfileId, RecordId, catalogue_enum};

use crate::fields::{
    ensure_not_future, optional_text, required_date, required_enum, required_text,
};
use crate::{FormSchema, SubmissionContext, ValidationErrors};

catalogue_enum! {
    pub enum Shift {
        Morning => "MORNING",
        Evening => "EVENING",
        Night => "NIGHT",
    }
}

/// The five checklist items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleComponents {
    pub hand_hygiene: bool,
    pub skin_preparation: bool,
    pub dressing_intact: bool,
    pub hub_disinfection: bool,
    pub line_necessity_review: bool,
}

impl BundleComponents {
    /// Items counted towards compliance on `day`.
    pub fn completed(&self, day: u32) -> u32 {
        let scored = [
            self.hand_hygiene,
            day == 1 && self.skin_preparation,
            self.dressing_intact,
            self.hub_disinfection,
            self.line_necessity_review,
        ];
        scored.iter().filter(|c| **c).count() as u32
    }
}

/// Day of the line episode, 1 on the admission date.
pub fn day_number(admission_date: NaiveDate, entry_date: NaiveDate) -> u32 {
    let days = (entry_date - admission_date).num_days().unsigned_abs();
    u32::try_from(days).unwrap_or(u32::MAX - 1) + 1
}

pub fn denominator(day: u32) -> u32 {
    if day == 1 { 5 } else { 4 }
}

/// Percentage of scored items completed, rounded half up.
pub fn compliance_percentage(components: &BundleComponents, day: u32) -> u8 {
    let completed = components.completed(day);
    let denominator = denominator(day);
    ((200 * completed + denominator) / (2 * denominator)) as u8
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BundleSubmission {
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub department: String,
    pub admission_date: String,
    pub entry_date: String,
    pub shift: String,
    #[serde(flatten)]
    pub components: BundleComponents,
    pub notes: Option<String>,
}

/// A row of `clabsi_bundle_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClabsiBundleEntry {
    pub id: RecordId,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    pub department: Department,
    pub admission_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub shift: Shift,
    pub day_number: u32,
    #[serde(flatten)]
    pub components: BundleComponents,
    pub compliance_percentage: u8,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_by: ProfileId,
    pub submitted_at: DateTime<Utc>,
}

impl ClabsiBundleEntry {
    pub fn key(&self) -> BundleKey {
        BundleKey {
            patient_id: self.patient_id.clone(),
            entry_date: self.entry_date,
            shift: self.shift,
        }
    }
}

impl FormSchema for BundleSubmission {
    const FORM_TYPE: FormType = FormType::ClabsiBundle;
    const TABLE: &'static str = "clabsi_bundle_entries";
    type Record = ClabsiBundleEntry;

    fn validate(&self, ctx: &SubmissionContext) -> Result<ClabsiBundleEntry, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient_id = required_text(&mut errors, "patient_id", &self.patient_id);
        let department =
            required_enum(&mut errors, "department", &self.department, Department::ALL);
        let admission = required_date(&mut errors, "admission_date", &self.admission_date);
        let entry = required_date(&mut errors, "entry_date", &self.entry_date);
        let shift = required_enum(&mut errors, "shift", &self.shift, Shift::ALL);
        ensure_not_future(&mut errors, "entry_date", entry, ctx.submitted_at.date_naive());

        match (patient_id, department, admission, entry, shift) {
            (Some(patient_id), Some(department), Some(admission_date), Some(entry_date), Some(shift))
                if errors.is_empty() =>
            {
                let day = day_number(admission_date, entry_date);
                Ok(ClabsiBundleEntry {
                    id: ctx.record_id,
                    patient_id,
                    patient_name: optional_text(&self.patient_name),
                    department,
                    admission_date,
                    entry_date,
                    shift,
                    day_number: day,
                    components: self.components,
                    compliance_percentage: compliance_percentage(&self.components, day),
                    notes: optional_text(&self.notes),
                    submitted_by: ctx.submitted_by,
                    submitted_at: ctx.submitted_at,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Identity of a bundle checklist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BundleKey {
    pub patient_id: String,
    pub entry_date: NaiveDate,
    pub shift: Shift,
}

impl core::fmt::Display for BundleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "patient {} on {} ({})", self.patient_id, self.entry_date, self.shift)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("an entry for {0} already exists")]
pub struct DuplicateEntry(pub BundleKey);

/// Reject `key` when the loaded entries already contain it.
pub fn ensure_unique<'a, I>(key: &BundleKey, existing: I) -> Result<(), DuplicateEntry>
where
    I: IntoIterator<Item = &'a ClabsiBundleEntry>,
{
    if existing.into_iter().any(|e| e.key() == *key) {
        return Err(DuplicateEntry(key.clone()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-patient summary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftCompliance {
    pub entry_date: NaiveDate,
    pub day_number: u32,
    pub shift: Shift,
    pub compliance_percentage: u8,
}

/// Compliance history for one patient's line episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleComplianceSummary {
    pub patient_id: String,
    pub entries: usize,
    /// Mean of the per-entry percentages, `None` without entries.
    pub average_compliance: Option<f64>,
    /// Entries scoring 100%.
    pub fully_compliant: usize,
    pub history: Vec<ShiftCompliance>,
}

pub fn summarize(patient_id: &str, entries: &[ClabsiBundleEntry]) -> BundleComplianceSummary {
    let mut history: Vec<ShiftCompliance> = entries
        .iter()
        .filter(|e| e.patient_id == patient_id)
        .map(|e| ShiftCompliance {
            entry_date: e.entry_date,
            day_number: e.day_number,
            shift: e.shift,
            compliance_percentage: e.compliance_percentage,
        })
        .collect();
    history.sort_by_key(|h| (h.entry_date, h.shift));

    let total: u32 = history.iter().map(|h| u32::from(h.compliance_percentage)).sum();
    let average_compliance = if history.is_empty() {
        None
    } else {
        Some(f64::from(total) / history.len() as f64)
    };

    BundleComplianceSummary {
        patient_id: patient_id.to_string(),
        entries: history.len(),
        average_compliance,
        fully_compliant: history.iter().filter(|h| h.compliance_percentage == 100).count(),
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx() -> SubmissionContext {
        SubmissionContext::new(
            ProfileId::new(),
            Utc.with_ymd_and_hms(2024, 6, 30, 9, 0, 0).unwrap(),
        )
    }

    fn all_done() -> BundleComponents {
        BundleComponents {
            hand_hygiene: true,
            skin_preparation: true,
            dressing_intact: true,
            hub_disinfection: true,
            line_necessity_review: true,
        }
    }

    fn entry(entry_date: &str, shift: &str) -> ClabsiBundleEntry {
        let sub: BundleSubmission = serde_json::from_value(json!({
            "patient_id": "MRN-5005",
            "department": "ICU",
            "admission_date": "2024-06-01",
            "entry_date": entry_date,
            "shift": shift,
            "hand_hygiene": true,
            "dressing_intact": true,
        }))
        .unwrap();
        sub.validate(&ctx()).unwrap()
    }

    #[test]
    fn day_one_is_the_admission_date() {
        assert_eq!(day_number(date(2024, 6, 1), date(2024, 6, 1)), 1);
        assert_eq!(day_number(date(2024, 6, 1), date(2024, 6, 2)), 2);
        assert_eq!(day_number(date(2024, 6, 1), date(2024, 6, 15)), 15);
    }

    #[test]
    fn entry_before_admission_counts_absolute_days() {
        assert_eq!(day_number(date(2024, 6, 5), date(2024, 6, 3)), 3);
    }

    #[test]
    fn day_one_four_of_five_is_eighty_percent() {
        let mut c = all_done();
        c.hub_disinfection = false;
        assert_eq!(compliance_percentage(&c, 1), 80);
    }

    #[test]
    fn later_days_ignore_skin_preparation() {
        let mut c = all_done();
        assert_eq!(compliance_percentage(&c, 2), 100);
        c.skin_preparation = false;
        assert_eq!(compliance_percentage(&c, 2), 100);
        c.hand_hygiene = false;
        assert_eq!(compliance_percentage(&c, 3), 75);
        assert_eq!(compliance_percentage(&BundleComponents::default(), 1), 0);
    }

    #[test]
    fn validated_entry_carries_day_and_score() {
        let e = entry("2024-06-03", "night");
        assert_eq!(e.day_number, 3);
        assert_eq!(e.shift, Shift::Night);
        assert_eq!(e.compliance_percentage, 50);
        let row = serde_json::to_value(&e).unwrap();
        assert_eq!(row["hand_hygiene"], true);
        assert_eq!(row["shift"], "NIGHT");
    }

    #[test]
    fn missing_shift_and_dates_are_reported() {
        let sub = BundleSubmission {
            patient_id: "MRN-5005".to_string(),
            department: "ICU".to_string(),
            ..Default::default()
        };
        let errors = sub.validate(&ctx()).unwrap_err();
        assert!(errors.has_field("shift"));
        assert!(errors.has_field("admission_date"));
        assert!(errors.has_field("entry_date"));
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let existing = vec![entry("2024-06-02", "MORNING"), entry("2024-06-02", "EVENING")];
        let dup = entry("2024-06-02", "MORNING").key();
        assert_eq!(ensure_unique(&dup, &existing), Err(DuplicateEntry(dup.clone())));

        let fresh = entry("2024-06-02", "NIGHT").key();
        assert!(ensure_unique(&fresh, &existing).is_ok());
    }

    #[test]
    fn summary_orders_history_and_averages() {
        let entries = vec![
            entry("2024-06-02", "NIGHT"),
            entry("2024-06-01", "MORNING"),
            entry("2024-06-02", "MORNING"),
        ];
        let s = summarize("MRN-5005", &entries);
        assert_eq!(s.entries, 3);
        assert_eq!(s.history[0].entry_date, date(2024, 6, 1));
        assert_eq!(s.history[1].shift, Shift::Morning);
        assert_eq!(s.history[2].shift, Shift::Night);
        // Day 1: 2/5 = 40, day 2: 2/4 = 50 twice.
        assert_eq!(s.average_compliance, Some(140.0 / 3.0));
        assert_eq!(s.fully_compliant, 0);

        assert_eq!(summarize("MRN-0000", &entries).average_compliance, None);
    }

    fn any_components() -> impl Strategy<Value = BundleComponents> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(a, b, c, d, e)| BundleComponents {
                hand_hygiene: a,
                skin_preparation: b,
                dressing_intact: c,
                hub_disinfection: d,
                line_necessity_review: e,
            },
        )
    }

    proptest! {
        /// Property: day numbers grow by exactly one per calendar day.
        #[test]
        fn day_number_grows_by_one(offset in 0i64..2000) {
            let admission = date(2024, 1, 1);
            let entry = admission + Duration::days(offset);
            prop_assert_eq!(day_number(admission, entry), offset as u32 + 1);
            prop_assert_eq!(
                day_number(admission, entry + Duration::days(1)),
                day_number(admission, entry) + 1
            );
        }

        /// Property: compliance stays within 0..=100 and skin preparation
        /// only matters on day 1.
        #[test]
        fn compliance_bounds(c in any_components(), day in 1u32..60) {
            let pct = compliance_percentage(&c, day);
            prop_assert!(pct <= 100);
            if day > 1 {
                let mut without = c;
                without.skin_preparation = !c.skin_preparation;
                prop_assert_eq!(compliance_percentage(&without, day), pct);
            }
        }
    }
}
