//! Surveillance record tables.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use ipcwatch_core::{Department, FormType, ProfileId, RecordId};
use ipcwatch_forms::bundle::ensure_unique;
use ipcwatch_forms::review::review_patch;
use ipcwatch_forms::{
    BundleSubmission, ClabsiBundleEntry, DuplicateEntry, FormSchema, ReviewMeta, ReviewStatus,
    ValidatedRecord, table_for,
};

use crate::store::{DataStore, Direction, Filter, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("form type {0} has no record table")]
    Unsupported(FormType),

    #[error(transparent)]
    Duplicate(#[from] DuplicateEntry),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Listing filters. Unset fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub department: Option<Department>,
    pub review_status: Option<ReviewStatus>,
    pub submitted_by: Option<ProfileId>,
    pub patient_id: Option<String>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(department) = self.department {
            filter = filter.eq("department", department);
        }
        if let Some(status) = self.review_status {
            filter = filter.eq("review_status", status);
        }
        if let Some(by) = self.submitted_by {
            filter = filter.eq("submitted_by", by);
        }
        if let Some(patient_id) = &self.patient_id {
            filter = filter.eq("patient_id", patient_id);
        }
        filter = filter.order_by("submitted_at", Direction::Desc);
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }
        filter
    }
}

#[derive(Clone)]
pub struct RecordRepository {
    store: Arc<dyn DataStore>,
}

impl RecordRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    fn table(form: FormType) -> Result<&'static str, RecordError> {
        table_for(form).ok_or(RecordError::Unsupported(form))
    }

    /// Insert a validated submission.
    ///
    /// Bundle entries are checked against the patient's existing entries
    /// first; a duplicate (patient, date, shift) never reaches the insert.
    pub async fn insert(&self, record: &ValidatedRecord) -> Result<Value, RecordError> {
        if let Some(key) = &record.bundle_key {
            let existing = self.bundle_entries(&key.patient_id).await?;
            ensure_unique(key, &existing)?;
        }
        let row = self.store.insert(record.table, record.row.clone()).await?;
        tracing::info!(
            form = %record.form,
            record_id = %record.record_id,
            "record inserted"
        );
        Ok(row)
    }

    pub async fn list(&self, form: FormType, query: &RecordQuery) -> Result<Vec<Value>, RecordError> {
        let table = Self::table(form)?;
        Ok(self.store.select(table, &query.to_filter()).await?)
    }

    pub async fn get(&self, form: FormType, id: RecordId) -> Result<Option<Value>, RecordError> {
        let table = Self::table(form)?;
        let rows = self
            .store
            .select(table, &Filter::new().eq("id", id).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Write the review columns after a workflow transition.
    pub async fn save_review(
        &self,
        form: FormType,
        id: RecordId,
        meta: &ReviewMeta,
    ) -> Result<Value, RecordError> {
        let table = Self::table(form)?;
        Ok(self
            .store
            .update(table, &id.to_string(), review_patch(meta))
            .await?)
    }

    /// Overwrite a record's data columns with a corrected, re-validated
    /// submission and apply the review transition in the same update.
    /// The row keeps its id.
    pub async fn save_revision(
        &self,
        record: &ValidatedRecord,
        meta: &ReviewMeta,
    ) -> Result<Value, RecordError> {
        let mut patch = record.row.clone();
        if let (Value::Object(columns), Value::Object(review)) = (&mut patch, review_patch(meta)) {
            columns.remove("id");
            columns.extend(review);
        }
        let row = self
            .store
            .update(record.table, &record.record_id.to_string(), patch)
            .await?;
        tracing::info!(
            form = %record.form,
            record_id = %record.record_id,
            "record revised"
        );
        Ok(row)
    }

    /// Every bundle entry recorded for a patient.
    pub async fn bundle_entries(&self, patient_id: &str) -> Result<Vec<ClabsiBundleEntry>, RecordError> {
        let rows = self
            .store
            .select(
                BundleSubmission::TABLE,
                &Filter::new()
                    .eq("patient_id", patient_id)
                    .order_by("entry_date", Direction::Asc),
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| RecordError::Store(StoreError::Decode(format!("bundle entry row: {e}"))))
            })
            .collect()
    }
}

/// Review columns of a stored row.
pub fn review_meta(row: &Value) -> Result<ReviewMeta, StoreError> {
    serde_json::from_value(row.clone()).map_err(|e| StoreError::Decode(format!("review columns: {e}")))
}
