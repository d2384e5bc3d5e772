use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use ipcwatch_auth::SessionWindow;
use ipcwatch_core::AuthUserId;

use super::{AuthProvider, AuthProviderError, AuthSession};
use crate::config::StoreConfig;

/// GoTrue-style adapter for the hosted auth service (`/auth/v1/...`).
#[derive(Debug, Clone)]
pub struct RestAuthProvider {
    client: Client,
    base_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl RestAuthProvider {
    pub fn new(config: &StoreConfig) -> Result<Self, AuthProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
            key: config.key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.key)
            .bearer_auth(bearer)
    }

    async fn send(request: RequestBuilder) -> Result<Response, AuthProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST if message.contains("invalid_grant") => {
                AuthProviderError::InvalidCredentials
            }
            _ => AuthProviderError::Remote {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait::async_trait]
impl AuthProvider for RestAuthProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        let request = self
            .request(Method::POST, "token", &self.key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| AuthProviderError::Decode(e.to_string()))?;

        let issued_at = Utc::now();
        let expires_at = token
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| issued_at + chrono::Duration::seconds(token.expires_in));

        Ok(AuthSession {
            auth_user_id: AuthUserId::from_uuid(token.user.id),
            email: token.user.email.unwrap_or_else(|| email.trim().to_lowercase()),
            access_token: token.access_token,
            window: SessionWindow {
                issued_at,
                expires_at,
            },
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        let request = self.request(Method::POST, "logout", access_token);
        Self::send(request).await.map(|_| ())
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUserId, AuthProviderError> {
        let request = self.request(Method::POST, "admin/users", &self.key).json(&json!({
            "email": email,
            "password": password,
            "email_confirm": true,
        }));
        let user: RemoteUser = match Self::send(request).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| AuthProviderError::Decode(e.to_string()))?,
            Err(AuthProviderError::Remote { status: 422, .. }) => {
                return Err(AuthProviderError::AlreadyRegistered(email.to_string()));
            }
            Err(e) => return Err(e),
        };
        Ok(AuthUserId::from_uuid(user.id))
    }

    async fn delete_user(&self, auth_user_id: AuthUserId) -> Result<(), AuthProviderError> {
        let request = self.request(
            Method::DELETE,
            &format!("admin/users/{auth_user_id}"),
            &self.key,
        );
        Self::send(request).await.map(|_| ())
    }
}
