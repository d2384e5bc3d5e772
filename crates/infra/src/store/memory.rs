use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::{DataStore, Direction, Filter, StoreError, cell_text};

pub type RpcHandler = Arc<dyn Fn(&Value) -> Result<Value, StoreError> + Send + Sync>;

/// In-memory stand-in for the hosted database.
///
/// Intended for tests/dev. Tables are created on first insert; remote
/// procedures must be registered explicitly.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    procedures: RwLock<HashMap<String, RpcHandler>>,
    insert_calls: RwLock<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl core::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_rpc<F>(&self, function: impl Into<String>, handler: F)
    where
        F: Fn(&Value) -> Result<Value, StoreError> + Send + Sync + 'static,
    {
        if let Ok(mut procedures) = self.procedures.write() {
            procedures.insert(function.into(), Arc::new(handler));
        }
    }

    /// Simulate the remote service being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many inserts were attempted against `table`.
    pub fn insert_calls(&self, table: &str) -> usize {
        self.insert_calls
            .read()
            .map(|calls| calls.get(table).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Every row currently in `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .map(|t| t.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> StoreError {
        StoreError::Transport("lock poisoned".to_string())
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    filter
        .equals
        .iter()
        .all(|(column, expected)| row.get(column).and_then(cell_text).as_deref() == Some(expected))
}

fn row_id(row: &Value) -> Option<String> {
    row.get("id").and_then(cell_text)
}

#[async_trait::async_trait]
impl DataStore for InMemoryStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, filter)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, direction)) = &filter.order {
            rows.sort_by(|a, b| {
                let ordering = a
                    .get(column)
                    .and_then(cell_text)
                    .cmp(&b.get(column).and_then(cell_text));
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Value, StoreError> {
        {
            let mut calls = self.insert_calls.write().map_err(|_| Self::poisoned())?;
            *calls.entry(table.to_string()).or_default() += 1;
        }
        self.ensure_online()?;

        let object = row.as_object_mut().ok_or_else(|| StoreError::Remote {
            status: 400,
            message: "row must be a JSON object".to_string(),
        })?;
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::now_v7().to_string()));

        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(id) = row_id(&row) {
            if rows.iter().any(|r| row_id(r).as_deref() == Some(id.as_str())) {
                return Err(StoreError::Remote {
                    status: 409,
                    message: format!("duplicate key value: id {id}"),
                });
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        self.ensure_online()?;
        let patch = match patch {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::Remote {
                    status: 400,
                    message: "patch must be a JSON object".to_string(),
                });
            }
        };

        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r).as_deref() == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;

        if let Some(object) = row.as_object_mut() {
            for (key, value) in patch {
                if key != "id" {
                    object.insert(key, value);
                }
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let rows = tables.get_mut(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })?;
        let before = rows.len();
        rows.retain(|r| row_id(r).as_deref() != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError> {
        self.ensure_online()?;
        let handler = self
            .procedures
            .read()
            .map_err(|_| Self::poisoned())?
            .get(function)
            .cloned()
            .ok_or_else(|| StoreError::Remote {
                status: 404,
                message: format!("function {function} does not exist"),
            })?;
        handler(&params)
    }
}
