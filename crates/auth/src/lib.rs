//! `ipcwatch-auth`: who may do what.
//!
//! Pure authorization logic: the role catalogue, the static role/department
//! permission matrix, the form-access resolver, profile change rules and the
//! session gate state machine. Decoupled from HTTP and from the remote store.

pub mod authorize;
pub mod permissions;
pub mod profile;
pub mod roles;
pub mod session;

pub use authorize::{
    AccessError, AccessExplanation, accessible_forms, authorize_form, can_access_form,
    can_access_form_with, can_manage_users, can_review_records, explain_access,
};
pub use permissions::{PermissionMatrix, PermissionTable};
pub use profile::{NewProfile, ProfileChanges, UserProfile};
pub use roles::Role;
pub use session::{
    RequestTicket, SessionError, SessionGate, SessionState, SessionWindow, TokenValidationError,
};
