//! Authentication service boundary (password sign-in, sign-out, and the
//! administrator account calls used by user management).

pub mod memory;
pub mod rest;

use std::sync::Arc;

use thiserror::Error;

use ipcwatch_auth::SessionWindow;
use ipcwatch_core::AuthUserId;

pub use memory::InMemoryAuthProvider;
pub use rest::RestAuthProvider;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthProviderError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),

    #[error("auth service unreachable: {0}")]
    Transport(String),

    #[error("auth service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response from auth service: {0}")]
    Decode(String),
}

/// A verified login as returned by the auth service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub auth_user_id: AuthUserId,
    pub email: String,
    pub access_token: String,
    pub window: SessionWindow,
}

impl core::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSession")
            .field("auth_user_id", &self.auth_user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("window", &self.window)
            .finish()
    }
}

#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError>;

    /// Revoke `access_token` remotely.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError>;

    /// Register a login identity (administrator action).
    async fn create_user(&self, email: &str, password: &str)
    -> Result<AuthUserId, AuthProviderError>;

    async fn delete_user(&self, auth_user_id: AuthUserId) -> Result<(), AuthProviderError>;
}

#[async_trait::async_trait]
impl<P> AuthProvider for Arc<P>
where
    P: AuthProvider + ?Sized,
{
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        (**self).sign_in_with_password(email, password).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        (**self).sign_out(access_token).await
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUserId, AuthProviderError> {
        (**self).create_user(email, password).await
    }

    async fn delete_user(&self, auth_user_id: AuthUserId) -> Result<(), AuthProviderError> {
        (**self).delete_user(auth_user_id).await
    }
}
