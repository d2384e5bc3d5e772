//! Field readers shared by every form schema.
//!
//! Readers never fail fast: each records its problem in the shared
//! [`ValidationErrors`] and returns `None`, so one pass reports every bad
//! field.

use core::fmt::Display;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ipcwatch_core::Department;

use crate::ValidationErrors;

/// Trimmed, non-empty text or an error on `field`.
pub fn required_text(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, "is required");
        return None;
    }
    Some(value.to_string())
}

/// Trimmed text, `None` when blank.
pub fn optional_text(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn required_date(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        errors.push(field, "is required");
        return None;
    }
    match parse_iso_date(raw) {
        Some(date) => Some(date),
        None => {
            errors.push(field, "must be a valid date (YYYY-MM-DD)");
            None
        }
    }
}

/// Enumerated value; the message lists what is accepted.
pub fn required_enum<T>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
    allowed: &[T],
) -> Option<T>
where
    T: FromStr + Display,
{
    if raw.trim().is_empty() {
        errors.push(field, "is required");
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(field, format!("must be one of: {}", one_of(allowed)));
            None
        }
    }
}

pub fn one_of<T: Display>(allowed: &[T]) -> String {
    allowed
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `earlier` must not fall after `later`.
pub fn ensure_not_after(
    errors: &mut ValidationErrors,
    field: &str,
    earlier: Option<NaiveDate>,
    later: Option<NaiveDate>,
    later_label: &str,
) {
    if let (Some(a), Some(b)) = (earlier, later) {
        if a > b {
            errors.push(field, format!("cannot be after the {later_label}"));
        }
    }
}

/// Event-type dates cannot lie in the future relative to submission.
pub fn ensure_not_future(
    errors: &mut ValidationErrors,
    field: &str,
    date: Option<NaiveDate>,
    today: NaiveDate,
) {
    if let Some(d) = date {
        if d > today {
            errors.push(field, "cannot be in the future");
        }
    }
}

/// Coerce an age input to a non-negative integer.
///
/// Numbers are truncated; strings contribute their leading integer
/// (`"42 years"` → 42). Negative values clamp to 0 and anything without a
/// leading integer becomes 0 rather than a validation error.
pub fn coerce_age(raw: &Value) -> u32 {
    match raw {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).unwrap_or(u32::MAX)
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 {
                    f.trunc().min(u32::MAX as f64) as u32
                } else {
                    0
                }
            } else {
                0
            }
        }
        Value::String(s) => leading_integer(s),
        _ => 0,
    }
}

fn leading_integer(s: &str) -> u32 {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || digits.is_empty() {
        return 0;
    }
    digits.parse::<u64>().map_or(u32::MAX, |v| u32::try_from(v).unwrap_or(u32::MAX))
}

// ─────────────────────────────────────────────────────────────────────────────
// Patient block
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: &'static [Gender] = &[Gender::Male, Gender::Female];
}

impl Display for Gender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        })
    }
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(()),
        }
    }
}

/// Patient fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientSubmission {
    pub patient_id: String,
    pub patient_name: String,
    pub age: Value,
    pub gender: String,
    pub department: String,
}

/// Normalised patient reference carried by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub patient_id: String,
    pub patient_name: String,
    pub age: u32,
    pub gender: Gender,
    pub department: Department,
}

impl PatientSubmission {
    pub fn validate(&self, errors: &mut ValidationErrors) -> Option<PatientInfo> {
        let patient_id = required_text(errors, "patient_id", &self.patient_id);
        let patient_name = required_text(errors, "patient_name", &self.patient_name);
        let gender = required_enum(errors, "gender", &self.gender, Gender::ALL);
        let department = required_enum(errors, "department", &self.department, Department::ALL);
        let age = coerce_age(&self.age);

        Some(PatientInfo {
            patient_id: patient_id?,
            patient_name: patient_name?,
            age,
            gender: gender?,
            department: department?,
        })
    }
}

/// True when at least one flag is set.
pub fn any_checked(flags: &[bool]) -> bool {
    flags.iter().any(|f| *f)
}
