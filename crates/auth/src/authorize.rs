use serde::Serialize;
use thiserror::Error;

use ipcwatch_core::{Department, FormType};

use crate::{PermissionMatrix, Role, UserProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("no active profile")]
    NoProfile,

    #[error("forbidden: role {role} has no access to {form}")]
    RoleDenied { role: Role, form: FormType },

    #[error("forbidden: department {department} has no access to {form}")]
    DepartmentDenied { department: Department, form: FormType },

    #[error("forbidden: reviewing records requires an IPC or administrator role")]
    NotReviewer,

    #[error("forbidden: administrator role required")]
    NotAdministrator,
}

/// Decide whether `profile` may create, read or update forms of type `form`,
/// using the standard permission matrix.
///
/// - No IO
/// - Fails closed when the profile is absent
pub fn can_access_form(profile: Option<&UserProfile>, form: FormType) -> bool {
    can_access_form_with(PermissionMatrix::standard(), profile, form)
}

/// [`can_access_form`] against an explicit matrix.
///
/// Privileged roles (administrator, IPC focal person, IPC officer) always
/// pass. Everyone else needs the form in their role's row AND their
/// department's row.
pub fn can_access_form_with(
    matrix: &PermissionMatrix,
    profile: Option<&UserProfile>,
    form: FormType,
) -> bool {
    authorize_form(matrix, profile, form).is_ok()
}

/// Like [`can_access_form_with`] but says which check failed.
pub fn authorize_form(
    matrix: &PermissionMatrix,
    profile: Option<&UserProfile>,
    form: FormType,
) -> Result<(), AccessError> {
    let profile = profile.ok_or(AccessError::NoProfile)?;

    if profile.role.is_privileged() {
        return Ok(());
    }
    if !matrix.role_allows(profile.role, form) {
        return Err(AccessError::RoleDenied {
            role: profile.role,
            form,
        });
    }
    if !matrix.department_allows(profile.department, form) {
        return Err(AccessError::DepartmentDenied {
            department: profile.department,
            form,
        });
    }
    Ok(())
}

/// Every form type the profile may open, in catalogue order.
pub fn accessible_forms(matrix: &PermissionMatrix, profile: Option<&UserProfile>) -> Vec<FormType> {
    FormType::ALL
        .iter()
        .copied()
        .filter(|f| can_access_form_with(matrix, profile, *f))
        .collect()
}

/// Only privileged roles may approve, reject or send back records.
pub fn can_review_records(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| p.role.is_privileged())
}

/// Only administrators manage accounts.
pub fn can_manage_users(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| p.role.is_admin())
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a form-access decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub role: Role,
    pub department: Department,
    pub form: FormType,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub privileged_role: bool,
    pub role_grants_form: bool,
    pub department_grants_form: bool,
    /// If denied, what would change the outcome.
    pub suggestions: Vec<String>,
}

/// Explain why a (role, department, form) triple is allowed or denied.
pub fn explain_access(
    matrix: &PermissionMatrix,
    role: Role,
    department: Department,
    form: FormType,
) -> AccessExplanation {
    let privileged_role = role.is_privileged();
    let role_grants_form = matrix.role_allows(role, form);
    let department_grants_form = matrix.department_allows(department, form);
    let granted = privileged_role || (role_grants_form && department_grants_form);

    let reason = if privileged_role {
        format!("Role {role} has access to every form type")
    } else if granted {
        format!("Both role {role} and department {department} list {form}")
    } else {
        match (role_grants_form, department_grants_form) {
            (false, false) => format!("Neither role {role} nor department {department} lists {form}"),
            (false, true) => format!("Role {role} does not list {form}"),
            (true, false) => format!("Department {department} does not list {form}"),
            (true, true) => unreachable!("granted case handled above"),
        }
    };

    let mut suggestions = Vec::new();
    if !granted {
        if !role_grants_form {
            let roles: Vec<&str> = Role::ALL
                .iter()
                .filter(|r| !r.is_privileged() && matrix.role_allows(**r, form))
                .map(|r| r.as_str())
                .collect();
            suggestions.push(format!("Roles that list {form}: {}", roles.join(", ")));
        }
        if !department_grants_form {
            let departments: Vec<&str> = Department::ALL
                .iter()
                .filter(|d| matrix.department_allows(**d, form))
                .map(|d| d.as_str())
                .collect();
            suggestions.push(format!(
                "Departments that list {form}: {}",
                departments.join(", ")
            ));
        }
        suggestions.push("An administrator can reassign the role or department".to_string());
    }

    AccessExplanation {
        role,
        department,
        form,
        granted,
        reason,
        privileged_role,
        role_grants_form,
        department_grants_form,
        suggestions,
    }
}
