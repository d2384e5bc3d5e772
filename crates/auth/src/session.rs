//! Session/profile gate.
//!
//! A [`SessionGate`] tracks one logical session through
//! `unauthenticated → authenticating → {authenticated_active,
//! authenticated_no_profile, error}` and back to `unauthenticated` on
//! sign-out. Every transition that completes an async step takes the
//! [`RequestTicket`] issued when the step started; a ticket from an older
//! generation (the session was signed out or restarted meanwhile) is
//! rejected as stale, so late responses never overwrite newer state.
//! Profile refreshes are additionally numbered: only the most recently
//! started refresh may write its result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use ipcwatch_core::AuthUserId;

use crate::UserProfile;

/// Observable gate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    /// Identity verified but no usable profile. Terminal for this session:
    /// an administrator has to create or reactivate the profile.
    AuthenticatedNoProfile { auth_user_id: AuthUserId },
    AuthenticatedActive { profile: UserProfile },
    Error { message: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::AuthenticatedNoProfile { .. } => "authenticated_no_profile",
            SessionState::AuthenticatedActive { .. } => "authenticated_active",
            SessionState::Error { .. } => "error",
        }
    }
}

/// Proof that an async step was started under a given gate generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    generation: u64,
    refresh: u64,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refresh(&self) -> u64 {
        self.refresh
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("sign-in already in progress")]
    SignInInProgress,

    #[error("already signed in")]
    AlreadySignedIn,

    #[error("session has no usable profile; sign out first")]
    SignOutRequired,

    #[error("stale response discarded (ticket generation {ticket}, current {current})")]
    Stale { ticket: u64, current: u64 },

    #[error("refresh superseded (ticket {ticket}, latest {latest})")]
    Superseded { ticket: u64, latest: u64 },

    #[error("no sign-in in progress")]
    NotAuthenticating,
}

#[derive(Debug, Clone)]
pub struct SessionGate {
    state: SessionState,
    generation: u64,
    refresh_seq: u64,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            generation: 0,
            refresh_seq: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The active profile, if and only if the gate is `authenticated_active`.
    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::AuthenticatedActive { profile } => Some(profile),
            _ => None,
        }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Credential submission: `unauthenticated | error → authenticating`.
    pub fn begin_sign_in(&mut self) -> Result<RequestTicket, SessionError> {
        match self.state {
            SessionState::Unauthenticated | SessionState::Error { .. } => {}
            SessionState::Authenticating => return Err(SessionError::SignInInProgress),
            SessionState::AuthenticatedActive { .. } => return Err(SessionError::AlreadySignedIn),
            SessionState::AuthenticatedNoProfile { .. } => {
                return Err(SessionError::SignOutRequired);
            }
        }
        self.generation += 1;
        self.state = SessionState::Authenticating;
        Ok(RequestTicket {
            generation: self.generation,
            refresh: self.refresh_seq,
        })
    }

    /// Identity verification (or the remote call) failed.
    pub fn identity_failed(
        &mut self,
        ticket: RequestTicket,
        message: impl Into<String>,
    ) -> Result<&SessionState, SessionError> {
        self.ensure_authenticating(ticket)?;
        self.state = SessionState::Error {
            message: message.into(),
        };
        Ok(&self.state)
    }

    /// Identity verified; the profile lookup could not be completed.
    pub fn profile_lookup_failed(
        &mut self,
        ticket: RequestTicket,
        message: impl Into<String>,
    ) -> Result<&SessionState, SessionError> {
        self.identity_failed(ticket, message)
    }

    /// Identity verified and profile rows loaded for it.
    ///
    /// Exactly one active row belonging to `auth_user_id` activates the
    /// session. None yields `authenticated_no_profile`; more than one is an
    /// inconsistency and yields `error`.
    pub fn resolve_profile(
        &mut self,
        ticket: RequestTicket,
        auth_user_id: AuthUserId,
        rows: Vec<UserProfile>,
    ) -> Result<&SessionState, SessionError> {
        self.ensure_authenticating(ticket)?;

        let mut active: Vec<UserProfile> = rows
            .into_iter()
            .filter(|p| p.auth_user_id == auth_user_id && p.active)
            .collect();

        self.state = match active.len() {
            0 => {
                tracing::warn!(%auth_user_id, "identity verified but no active profile");
                SessionState::AuthenticatedNoProfile { auth_user_id }
            }
            1 => SessionState::AuthenticatedActive {
                profile: active.remove(0),
            },
            n => {
                tracing::error!(%auth_user_id, count = n, "multiple active profiles for identity");
                SessionState::Error {
                    message: format!("{n} active profiles found for this account"),
                }
            }
        };
        Ok(&self.state)
    }

    /// Replace the cached profile after a refresh fetched under `ticket`.
    ///
    /// A profile that is no longer active (or no longer found) drops the
    /// session to `authenticated_no_profile`. A ticket from a refresh that
    /// was overtaken by a later [`begin_refresh`](Self::begin_refresh) is
    /// rejected.
    pub fn refresh_profile(
        &mut self,
        ticket: RequestTicket,
        profile: Option<UserProfile>,
    ) -> Result<&SessionState, SessionError> {
        self.ensure_current(ticket)?;
        if ticket.refresh != self.refresh_seq {
            return Err(SessionError::Superseded {
                ticket: ticket.refresh,
                latest: self.refresh_seq,
            });
        }
        let auth_user_id = match &self.state {
            SessionState::AuthenticatedActive { profile } => profile.auth_user_id,
            _ => return Err(SessionError::NotAuthenticating),
        };
        self.state = match profile {
            Some(p) if p.active && p.auth_user_id == auth_user_id => {
                SessionState::AuthenticatedActive { profile: p }
            }
            _ => SessionState::AuthenticatedNoProfile { auth_user_id },
        };
        Ok(&self.state)
    }

    /// Start a profile refresh. Any refresh still in flight is superseded.
    pub fn begin_refresh(&mut self) -> RequestTicket {
        self.refresh_seq += 1;
        RequestTicket {
            generation: self.generation,
            refresh: self.refresh_seq,
        }
    }

    /// Any state → `unauthenticated`. Cached profile data is dropped here,
    /// before any remote sign-out is attempted, and outstanding tickets
    /// become stale.
    pub fn sign_out(&mut self) -> SessionState {
        self.generation += 1;
        std::mem::replace(&mut self.state, SessionState::Unauthenticated)
    }

    fn ensure_current(&self, ticket: RequestTicket) -> Result<(), SessionError> {
        if !self.is_current(ticket) {
            return Err(SessionError::Stale {
                ticket: ticket.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn ensure_authenticating(&self, ticket: RequestTicket) -> Result<(), SessionError> {
        self.ensure_current(ticket)?;
        if self.state != SessionState::Authenticating {
            return Err(SessionError::NotAuthenticating);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token validity window
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Validity window of an access token issued by the auth service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWindow {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionWindow {
    /// Deterministically check the window against `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
        if self.expires_at <= self.issued_at {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        if now < self.issued_at {
            return Err(TokenValidationError::NotYetValid);
        }
        if now >= self.expires_at {
            return Err(TokenValidationError::Expired);
        }
        Ok(())
    }
}
