//! Static role × form and department × form grant tables.
//!
//! Both tables live in one [`PermissionMatrix`], built once per process and
//! shared by every caller. Access checks intersect the two rows; see
//! [`crate::authorize`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Serialize;

use ipcwatch_core::{Department, FormType};

use crate::Role;

use ipcwatch_core::FormType::{Cauti, Clabsi, ClabsiBundle, Mdro, Ssi, Vap};

const ROLE_GRANTS: &[(Role, &[FormType])] = &[
    (Role::Admin, FormType::ALL),
    (Role::IpcFocalPerson, FormType::ALL),
    (Role::IpcOfficer, FormType::ALL),
    (Role::Physician, &[Cauti, Clabsi, Mdro, Ssi, Vap]),
    (Role::Resident, &[Cauti, Clabsi, Ssi, Vap]),
    (Role::HeadNurse, &[Cauti, Clabsi, ClabsiBundle, Mdro, Ssi, Vap]),
    (Role::StaffNurse, &[Cauti, Clabsi, Vap]),
    (Role::NurseIntern, &[Cauti]),
    (Role::Microbiologist, &[Mdro]),
    (Role::LabTechnician, &[Mdro]),
    (Role::QualityOfficer, &[Cauti, Clabsi, ClabsiBundle, Mdro, Ssi, Vap]),
    (Role::Pharmacist, &[Mdro]),
];

const CRITICAL_CARE: &[FormType] = &[Cauti, Clabsi, ClabsiBundle, Mdro, Vap];
const SURGICAL: &[FormType] = &[Cauti, Mdro, Ssi];
const MEDICAL: &[FormType] = &[Cauti, Clabsi, ClabsiBundle, Mdro];

const DEPARTMENT_GRANTS: &[(Department, &[FormType])] = &[
    (Department::Icu, CRITICAL_CARE),
    (Department::Nicu, CRITICAL_CARE),
    (Department::Picu, CRITICAL_CARE),
    (Department::Ccu, CRITICAL_CARE),
    (Department::Emergency, &[Cauti, Mdro]),
    (Department::GeneralSurgery, SURGICAL),
    (Department::InternalMedicine, MEDICAL),
    (Department::Pediatrics, &[Cauti, Clabsi, Mdro]),
    (Department::ObstetricsGynecology, &[Cauti, Ssi]),
    (Department::Orthopedics, SURGICAL),
    (Department::Neurosurgery, &[Cauti, Clabsi, Mdro, Ssi, Vap]),
    (Department::CardiacSurgery, &[Cauti, Clabsi, ClabsiBundle, Mdro, Ssi, Vap]),
    (Department::Oncology, MEDICAL),
    (Department::Hematology, MEDICAL),
    (Department::NephrologyDialysis, &[Clabsi, ClabsiBundle, Mdro]),
    (Department::BurnUnit, &[Cauti, Clabsi, Mdro]),
    (Department::OperatingTheatre, &[Ssi]),
    (Department::Laboratory, &[Mdro]),
    (Department::IpcUnit, FormType::ALL),
];

/// Two-dimensional grant lookup: one boolean grid per axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    roles: [[bool; FormType::COUNT]; Role::COUNT],
    departments: [[bool; FormType::COUNT]; Department::COUNT],
}

impl PermissionMatrix {
    /// A matrix with no grants at all.
    pub fn empty() -> Self {
        Self {
            roles: [[false; FormType::COUNT]; Role::COUNT],
            departments: [[false; FormType::COUNT]; Department::COUNT],
        }
    }

    /// Build from explicit grant lists. Unlisted rows grant nothing.
    pub fn from_grants(
        role_grants: &[(Role, &[FormType])],
        department_grants: &[(Department, &[FormType])],
    ) -> Self {
        let mut matrix = Self::empty();
        for (role, forms) in role_grants {
            matrix.grant_role(*role, forms);
        }
        for (department, forms) in department_grants {
            matrix.grant_department(*department, forms);
        }
        matrix
    }

    /// The hospital's standard grant tables, built on first use.
    pub fn standard() -> &'static PermissionMatrix {
        static STANDARD: OnceLock<PermissionMatrix> = OnceLock::new();
        STANDARD.get_or_init(|| {
            tracing::debug!("building standard permission matrix");
            PermissionMatrix::from_grants(ROLE_GRANTS, DEPARTMENT_GRANTS)
        })
    }

    pub fn grant_role(&mut self, role: Role, forms: &[FormType]) {
        for form in forms {
            self.roles[role.index()][form.index()] = true;
        }
    }

    pub fn grant_department(&mut self, department: Department, forms: &[FormType]) {
        for form in forms {
            self.departments[department.index()][form.index()] = true;
        }
    }

    pub fn role_allows(&self, role: Role, form: FormType) -> bool {
        self.roles[role.index()][form.index()]
    }

    pub fn department_allows(&self, department: Department, form: FormType) -> bool {
        self.departments[department.index()][form.index()]
    }

    pub fn forms_for_role(&self, role: Role) -> Vec<FormType> {
        FormType::ALL
            .iter()
            .copied()
            .filter(|f| self.role_allows(role, *f))
            .collect()
    }

    pub fn forms_for_department(&self, department: Department) -> Vec<FormType> {
        FormType::ALL
            .iter()
            .copied()
            .filter(|f| self.department_allows(department, *f))
            .collect()
    }

    /// Flatten both grids into a serializable listing (for audit endpoints).
    pub fn to_table(&self) -> PermissionTable {
        PermissionTable {
            roles: Role::ALL
                .iter()
                .map(|r| (r.as_str().to_string(), self.forms_for_role(*r)))
                .collect(),
            departments: Department::ALL
                .iter()
                .map(|d| (d.as_str().to_string(), self.forms_for_department(*d)))
                .collect(),
        }
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::standard().clone()
    }
}

/// Readable dump of the matrix, keyed by wire codes.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionTable {
    pub roles: BTreeMap<String, Vec<FormType>>,
    pub departments: BTreeMap<String, Vec<FormType>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_and_department_has_a_row() {
        let roles: Vec<Role> = ROLE_GRANTS.iter().map(|(r, _)| *r).collect();
        assert_eq!(roles.len(), Role::COUNT);
        for role in Role::ALL {
            assert!(roles.contains(role), "missing grants for {role}");
        }

        let departments: Vec<Department> = DEPARTMENT_GRANTS.iter().map(|(d, _)| *d).collect();
        assert_eq!(departments.len(), Department::COUNT);
        for department in Department::ALL {
            assert!(departments.contains(department), "missing grants for {department}");
        }
    }

    #[test]
    fn staff_nurse_list_is_cauti_clabsi_vap() {
        let m = PermissionMatrix::standard();
        assert_eq!(
            m.forms_for_role(Role::StaffNurse),
            vec![FormType::Cauti, FormType::Clabsi, FormType::Vap]
        );
        assert!(!m.role_allows(Role::StaffNurse, FormType::Mdro));
    }

    #[test]
    fn empty_matrix_grants_nothing() {
        let m = PermissionMatrix::empty();
        for role in Role::ALL {
            assert!(m.forms_for_role(*role).is_empty());
        }
    }

    #[test]
    fn table_lists_every_row() {
        let table = PermissionMatrix::standard().to_table();
        assert_eq!(table.roles.len(), Role::COUNT);
        assert_eq!(table.departments.len(), Department::COUNT);
        assert_eq!(table.departments["OPERATING_THEATRE"], vec![FormType::Ssi]);
    }
}
