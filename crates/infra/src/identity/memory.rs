use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use uuid::Uuid;

use ipcwatch_auth::SessionWindow;
use ipcwatch_core::AuthUserId;

use super::{AuthProvider, AuthProviderError, AuthSession};

#[derive(Debug, Clone)]
struct Account {
    id: AuthUserId,
    password: String,
}

/// In-memory auth service for tests/dev.
#[derive(Debug)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
    tokens: RwLock<HashSet<String>>,
    token_ttl: Duration,
    fail_sign_out: AtomicBool,
    offline: AtomicBool,
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashSet::new()),
            token_ttl: Duration::hours(1),
            fail_sign_out: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account directly.
    pub fn register(&self, email: &str, password: &str) -> AuthUserId {
        let id = AuthUserId::new();
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(
                email.trim().to_lowercase(),
                Account {
                    id,
                    password: password.to_string(),
                },
            );
        }
        id
    }

    /// Make remote sign-out fail (the local session must still end).
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn active_tokens(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), AuthProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthProviderError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> AuthProviderError {
        AuthProviderError::Transport("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        self.ensure_online()?;
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&email)
            .cloned()
            .ok_or(AuthProviderError::InvalidCredentials)?;
        if account.password != password {
            return Err(AuthProviderError::InvalidCredentials);
        }

        let access_token = Uuid::now_v7().simple().to_string();
        self.tokens
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(access_token.clone());

        let now = Utc::now();
        Ok(AuthSession {
            auth_user_id: account.id,
            email,
            access_token,
            window: SessionWindow {
                issued_at: now,
                expires_at: now + self.token_ttl,
            },
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        self.ensure_online()?;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthProviderError::Remote {
                status: 500,
                message: "sign-out failed".to_string(),
            });
        }
        self.tokens
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(access_token);
        Ok(())
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUserId, AuthProviderError> {
        self.ensure_online()?;
        let key = email.trim().to_lowercase();
        let mut accounts = self.accounts.write().map_err(|_| Self::poisoned())?;
        if accounts.contains_key(&key) {
            return Err(AuthProviderError::AlreadyRegistered(key));
        }
        let id = AuthUserId::new();
        accounts.insert(
            key,
            Account {
                id,
                password: password.to_string(),
            },
        );
        Ok(id)
    }

    async fn delete_user(&self, auth_user_id: AuthUserId) -> Result<(), AuthProviderError> {
        self.ensure_online()?;
        let mut accounts = self.accounts.write().map_err(|_| Self::poisoned())?;
        let before = accounts.len();
        accounts.retain(|_, a| a.id != auth_user_id);
        if accounts.len() == before {
            return Err(AuthProviderError::Remote {
                status: 404,
                message: format!("user {auth_user_id} not found"),
            });
        }
        Ok(())
    }
}
