//! Field-level validation errors.

use serde::Serialize;
use thiserror::Error;

/// One rejected field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every problem found in a submission. Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Why a submission could not be turned into an insertable row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("form type {0} has no submission schema")]
    Unsupported(ipcwatch_core::FormType),

    #[error("malformed submission: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}
