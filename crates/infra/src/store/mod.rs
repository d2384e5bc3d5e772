//! Remote data store boundary.
//!
//! Everything persistent lives in the hosted database. This module exposes
//! the handful of primitives the service needs (select with filter, insert,
//! update by id, delete by id, remote procedure call) behind one async
//! trait, with a REST adapter for the real service and an in-memory adapter
//! for tests and local development.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use rest::RestStore;

/// Remote-store failure. Never retried by the service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("remote store unreachable: {0}")]
    Transport(String),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response from remote store: {0}")]
    Decode(String),

    #[error("no row with id {id} in {table}")]
    NotFound { table: String, id: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filter with optional ordering and limit.
///
/// Values are compared in their text form, the way a query string carries
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub equals: Vec<(String, String)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.equals.push((column.into(), value.to_string()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Text form of a JSON scalar, as compared by filters.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    /// Rows of `table` matching `filter`.
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Merge `patch` into the row whose `id` is `id`; returns the updated row.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;

    /// Call a remote procedure and return its result unchanged.
    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError>;
}

#[async_trait::async_trait]
impl<S> DataStore for Arc<S>
where
    S: DataStore + ?Sized,
{
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        (**self).select(table, filter).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        (**self).update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        (**self).delete(table, id).await
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError> {
        (**self).rpc(function, params).await
    }
}
