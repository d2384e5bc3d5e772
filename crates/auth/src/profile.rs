//! User profiles: the role/department-bearing record behind a login identity.
//!
//! # Invariants
//! - A profile is linked to exactly one auth identity.
//! - Role, department and the active flag change only through an
//!   administrator acting on *another* profile; nobody edits their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ipcwatch_core::{AuthUserId, Department, DomainError, ProfileId};

use crate::Role;

/// A profile row as persisted in the remote `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub auth_user_id: AuthUserId,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub department: Department,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile (administrator action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub auth_user_id: AuthUserId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub department: Department,
}

/// A partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ProfileChanges {
    /// Whether the update touches fields reserved for administrators.
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.department.is_some() || self.active.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none() && !self.touches_privileged_fields()
    }
}

impl UserProfile {
    /// Validate and build a new, active profile.
    pub fn create(
        input: NewProfile,
        id: ProfileId,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, DomainError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        let full_name = input.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }

        Ok(UserProfile {
            id,
            auth_user_id: input.auth_user_id,
            full_name,
            email,
            phone: normalize_phone(input.phone),
            role: input.role,
            department: input.department,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply `changes` on behalf of `actor`, returning the updated profile.
    ///
    /// Owners may edit their name and phone. Role, department and active
    /// status require an administrator, and even an administrator cannot
    /// change them on their own profile.
    pub fn apply_changes(
        &self,
        changes: &ProfileChanges,
        actor: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, DomainError> {
        let is_self = actor.id == self.id;

        if changes.touches_privileged_fields() {
            if is_self {
                return Err(DomainError::unauthorized(
                    "role, department and active status cannot be changed on your own profile",
                ));
            }
            if !actor.role.is_admin() {
                return Err(DomainError::unauthorized(
                    "only an administrator may change role, department or active status",
                ));
            }
        } else if !is_self && !actor.role.is_admin() {
            return Err(DomainError::unauthorized(
                "only an administrator may edit another user's profile",
            ));
        }

        let mut next = self.clone();

        if let Some(name) = &changes.full_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("full name cannot be empty"));
            }
            next.full_name = name.to_string();
        }
        if let Some(phone) = &changes.phone {
            next.phone = normalize_phone(Some(phone.clone()));
        }
        if let Some(role) = changes.role {
            next.role = role;
        }
        if let Some(department) = changes.department {
            next.department = department;
        }
        if let Some(active) = changes.active {
            next.active = active;
        }

        next.updated_at = now;
        Ok(next)
    }
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
