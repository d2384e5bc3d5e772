use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

use super::{DataStore, Direction, Filter, StoreError};
use crate::config::StoreConfig;

/// PostgREST-style adapter for the hosted database.
///
/// Tables live under `/rest/v1/{table}`, remote procedures under
/// `/rest/v1/rpc/{function}`. Every request carries the project key both as
/// `apikey` and as the bearer token.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    key: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
            key: config.key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %message, "remote store rejected request");
            return Err(StoreError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn single_row(response: Response, table: &str, id: &str) -> Result<Value, StoreError> {
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })
    }
}

/// Query-string pairs for a filter: `col=eq.value`, `order=col.desc`, `limit=n`.
pub fn query_pairs(filter: &Filter) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = filter
        .equals
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{value}")))
        .collect();
    if let Some((column, direction)) = &filter.order {
        let dir = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        pairs.push(("order".to_string(), format!("{column}.{dir}")));
    }
    if let Some(limit) = filter.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
}

#[async_trait::async_trait]
impl DataStore for RestStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let request = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(&query_pairs(filter));
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(request).await?;
        let id = row.get("id").and_then(super::cell_text).unwrap_or_default();
        Self::single_row(response, table, &id).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        let request = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(request).await?;
        Self::single_row(response, table, id).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;
        Self::single_row(response, table, id).await.map(|_| ())
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError> {
        let request = self
            .request(Method::POST, &format!("rpc/{function}"))
            .json(&params);
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}
