//! Server-side registry of signed-in sessions.
//!
//! Lifecycle per entry: created on successful sign-in, refreshed in place,
//! torn down on sign-out. Each entry owns its [`SessionGate`]; refreshes
//! run against a [`RequestTicket`] so a refresh that completes after a
//! sign-out (or after a newer refresh) is dropped instead of resurrecting
//! the session.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use ipcwatch_auth::{
    RequestTicket, SessionError, SessionGate, SessionState, SessionWindow, UserProfile,
};
use ipcwatch_core::AuthUserId;

use crate::identity::AuthSession;

/// Opaque bearer token handed to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Only a prefix; tokens are credentials.
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "{prefix}…")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown or signed-out session")]
    UnknownSession,

    #[error("session expired")]
    Expired,

    #[error("session has no active profile ({})", .0.name())]
    ProfileUnavailable(SessionState),

    #[error(transparent)]
    Gate(#[from] SessionError),

    #[error("session registry lock poisoned")]
    Poisoned,
}

/// What a request handler gets to see of a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub token: SessionToken,
    pub auth_user_id: AuthUserId,
    pub profile: UserProfile,
    pub window: SessionWindow,
    pub generation: u64,
}

#[derive(Debug)]
struct Entry {
    gate: SessionGate,
    auth: AuthSession,
}

/// Removed session: the remote token to revoke and the state it was in.
#[derive(Debug)]
pub struct EndedSession {
    pub access_token: String,
    pub previous: SessionState,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<SessionToken, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate that reached `authenticated_active`.
    ///
    /// Entries whose window has lapsed by `now` are swept first, so sessions
    /// abandoned without a sign-out do not pile up.
    pub fn open(
        &self,
        gate: SessionGate,
        auth: AuthSession,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, RegistryError> {
        if gate.profile().is_none() {
            return Err(RegistryError::ProfileUnavailable(gate.state().clone()));
        }
        let token = SessionToken::generate();
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, e| e.auth.window.validate(now).is_ok());
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, "expired sessions removed");
        }
        entries.insert(token.clone(), Entry { gate, auth });
        tracing::info!(session = %token, "session opened");
        Ok(token)
    }

    /// Resolve a bearer token to its active session.
    ///
    /// Expired entries are removed on sight.
    pub fn lookup(
        &self,
        token: &SessionToken,
        now: DateTime<Utc>,
    ) -> Result<ActiveSession, RegistryError> {
        {
            let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
            let entry = entries.get(token).ok_or(RegistryError::UnknownSession)?;
            if entry.auth.window.validate(now).is_ok() {
                return match entry.gate.profile() {
                    Some(profile) => Ok(ActiveSession {
                        token: token.clone(),
                        auth_user_id: entry.auth.auth_user_id,
                        profile: profile.clone(),
                        window: entry.auth.window,
                        generation: entry.gate.generation(),
                    }),
                    None => Err(RegistryError::ProfileUnavailable(entry.gate.state().clone())),
                };
            }
        }

        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        entries.remove(token);
        tracing::info!(session = %token, "session expired");
        Err(RegistryError::Expired)
    }

    /// Gate state for a token, whatever it is.
    pub fn state(&self, token: &SessionToken) -> Result<SessionState, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::Poisoned)?;
        entries
            .get(token)
            .map(|e| e.gate.state().clone())
            .ok_or(RegistryError::UnknownSession)
    }

    /// Issue a ticket for a profile refresh. Earlier tickets for the same
    /// session stop being accepted.
    pub fn begin_refresh(
        &self,
        token: &SessionToken,
    ) -> Result<(RequestTicket, ProfileRef), RegistryError> {
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        let entry = entries.get_mut(token).ok_or(RegistryError::UnknownSession)?;
        let target = match entry.gate.profile() {
            Some(profile) => ProfileRef {
                profile_id: profile.id,
                auth_user_id: entry.auth.auth_user_id,
            },
            None => return Err(RegistryError::ProfileUnavailable(entry.gate.state().clone())),
        };
        Ok((entry.gate.begin_refresh(), target))
    }

    /// Apply a refreshed profile fetched under `ticket`.
    ///
    /// A session that was signed out meanwhile stays gone, and a refresh
    /// overtaken by a newer one leaves the cached profile alone.
    pub fn complete_refresh(
        &self,
        token: &SessionToken,
        ticket: RequestTicket,
        profile: Option<UserProfile>,
    ) -> Result<SessionState, RegistryError> {
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        let entry = entries.get_mut(token).ok_or_else(|| {
            tracing::debug!(session = %token, "refresh completed after sign-out; discarded");
            RegistryError::UnknownSession
        })?;
        let state = entry.gate.refresh_profile(ticket, profile)?.clone();
        Ok(state)
    }

    /// Tear down a session. Local state is gone when this returns.
    pub fn close(&self, token: &SessionToken) -> Result<EndedSession, RegistryError> {
        let mut entries = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        let mut entry = entries.remove(token).ok_or(RegistryError::UnknownSession)?;
        let previous = entry.gate.sign_out();
        tracing::info!(session = %token, previous = previous.name(), "session closed");
        Ok(EndedSession {
            access_token: entry.auth.access_token,
            previous,
        })
    }

    /// Drop every session belonging to a login identity (account deleted or
    /// deactivated). Returns how many were closed.
    pub fn close_for_identity(&self, auth_user_id: AuthUserId) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, e| e.auth.auth_user_id != auth_user_id);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which profile a refresh should fetch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    pub profile_id: ipcwatch_core::ProfileId,
    pub auth_user_id: AuthUserId,
}
