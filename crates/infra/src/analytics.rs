//! Parameterised aggregation requests.
//!
//! Aggregation runs inside the database as remote procedures; this module
//! only checks the parameters against what each surveillance table exposes
//! and forwards them. Results are passed through unchanged.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::store::{DataStore, StoreError};

pub const TREND_FUNCTION: &str = "get_trend_data";
pub const BREAKDOWN_FUNCTION: &str = "get_breakdown_data";
pub const SUMMARY_FUNCTION: &str = "get_dashboard_summary";

/// Longest range a single request may span.
pub const MAX_RANGE_DAYS: i64 = 366 * 5;

struct TableColumns {
    table: &'static str,
    date_columns: &'static [&'static str],
    category_columns: &'static [&'static str],
}

const COMMON_CATEGORIES: &[&str] = &["department", "gender", "review_status"];

const TABLES: &[TableColumns] = &[
    TableColumns {
        table: "cauti_reports",
        date_columns: &["event_date", "admission_date", "catheter_insertion_date", "submitted_at"],
        category_columns: &["department", "gender", "review_status", "organism"],
    },
    TableColumns {
        table: "clabsi_reports",
        date_columns: &["event_date", "admission_date", "line_insertion_date", "submitted_at"],
        category_columns: &["department", "gender", "review_status", "line_type", "organism"],
    },
    TableColumns {
        table: "mdro_reports",
        date_columns: &["specimen_collection_date", "submitted_at"],
        category_columns: &[
            "department",
            "gender",
            "review_status",
            "organism",
            "specimen_type",
            "classification",
            "priority",
        ],
    },
    TableColumns {
        table: "ssi_reports",
        date_columns: &["procedure_date", "event_date", "submitted_at"],
        category_columns: &["department", "gender", "review_status", "wound_class", "ssi_type"],
    },
    TableColumns {
        table: "clabsi_bundle_entries",
        date_columns: &["entry_date", "submitted_at"],
        category_columns: &["department", "shift"],
    },
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnalyticsKind {
    /// Counts over time; the column is a date column.
    Trend,
    /// Counts per category; the column is categorical.
    Breakdown,
}

impl AnalyticsKind {
    pub fn function(self) -> &'static str {
        match self {
            AnalyticsKind::Trend => TREND_FUNCTION,
            AnalyticsKind::Breakdown => BREAKDOWN_FUNCTION,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("start_date must not be after end_date")]
    InvertedRange,

    #[error("date range may span at most {} days", MAX_RANGE_DAYS)]
    RangeTooLong,

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("column '{column}' cannot be used for a {kind} on {table}; allowed: {allowed}")]
    ColumnNotAllowed {
        table: String,
        column: String,
        kind: &'static str,
        allowed: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.start_date > self.end_date {
            return Err(AnalyticsError::InvertedRange);
        }
        if (self.end_date - self.start_date).num_days() > MAX_RANGE_DAYS {
            return Err(AnalyticsError::RangeTooLong);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub table: String,
    pub column: String,
}

impl AnalyticsRequest {
    pub fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn validate(&self, kind: AnalyticsKind) -> Result<(), AnalyticsError> {
        self.range().validate()?;
        let columns = TABLES
            .iter()
            .find(|t| t.table == self.table)
            .ok_or_else(|| AnalyticsError::UnknownTable(self.table.clone()))?;
        let (allowed, label) = match kind {
            AnalyticsKind::Trend => (columns.date_columns, "trend"),
            AnalyticsKind::Breakdown => (columns.category_columns, "breakdown"),
        };
        if !allowed.contains(&self.column.as_str()) {
            return Err(AnalyticsError::ColumnNotAllowed {
                table: self.table.clone(),
                column: self.column.clone(),
                kind: label,
                allowed: allowed.join(", "),
            });
        }
        Ok(())
    }

    fn params(&self) -> Value {
        json!({
            "start_date": self.start_date,
            "end_date": self.end_date,
            "table_name": self.table,
            "column_name": self.column,
        })
    }
}

/// Tables that can be aggregated, for discovery endpoints.
pub fn aggregatable_tables() -> Vec<&'static str> {
    TABLES.iter().map(|t| t.table).collect()
}

/// Categorical columns every report table shares.
pub fn common_categories() -> &'static [&'static str] {
    COMMON_CATEGORIES
}

#[derive(Clone)]
pub struct AnalyticsClient {
    store: Arc<dyn DataStore>,
}

impl AnalyticsClient {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        &self,
        kind: AnalyticsKind,
        request: &AnalyticsRequest,
    ) -> Result<Value, AnalyticsError> {
        request.validate(kind)?;
        tracing::debug!(
            function = kind.function(),
            table = %request.table,
            column = %request.column,
            "analytics request"
        );
        Ok(self.store.rpc(kind.function(), request.params()).await?)
    }

    pub async fn summary(&self, range: &DateRange) -> Result<Value, AnalyticsError> {
        range.validate()?;
        let params = json!({
            "start_date": range.start_date,
            "end_date": range.end_date,
        });
        Ok(self.store.rpc(SUMMARY_FUNCTION, params).await?)
    }
}
