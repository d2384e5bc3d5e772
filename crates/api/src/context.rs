use chrono::{DateTime, Utc};

use ipcwatch_auth::{Role, UserProfile};
use ipcwatch_core::{Department, ProfileId};
use ipcwatch_infra::{ActiveSession, SessionToken};

/// Signed-in caller for a request.
///
/// Built from the session registry by the auth middleware; handlers never
/// see a request without one on protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: SessionToken,
    profile: UserProfile,
    expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(token: SessionToken, profile: UserProfile, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            profile,
            expires_at,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn profile_id(&self) -> ProfileId {
        self.profile.id
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn department(&self) -> Department {
        self.profile.department
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<ActiveSession> for SessionContext {
    fn from(session: ActiveSession) -> Self {
        Self::new(session.token, session.profile, session.window.expires_at)
    }
}
