//! Role catalogue used for access decisions.

use ipcwatch_core::catalogue_enum;

catalogue_enum! {
    /// One of the 12 roles a profile can carry.
    pub enum Role {
        Admin => "ADMIN",
        IpcFocalPerson => "IPC_FOCAL_PERSON",
        IpcOfficer => "IPC_OFFICER",
        Physician => "PHYSICIAN",
        Resident => "RESIDENT",
        HeadNurse => "HEAD_NURSE",
        StaffNurse => "STAFF_NURSE",
        NurseIntern => "NURSE_INTERN",
        Microbiologist => "MICROBIOLOGIST",
        LabTechnician => "LAB_TECHNICIAN",
        QualityOfficer => "QUALITY_OFFICER",
        Pharmacist => "PHARMACIST",
    }
}

impl Role {
    /// Roles that bypass the role/department intersection entirely.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::IpcFocalPerson | Role::IpcOfficer)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Admin => "System administrator; manages accounts and sees every form",
            Role::IpcFocalPerson => "Infection prevention focal person for the facility",
            Role::IpcOfficer => "Infection prevention and control officer",
            Role::Physician => "Attending physician",
            Role::Resident => "Resident physician",
            Role::HeadNurse => "Ward head nurse",
            Role::StaffNurse => "Staff nurse",
            Role::NurseIntern => "Nurse intern",
            Role::Microbiologist => "Clinical microbiologist",
            Role::LabTechnician => "Laboratory technician",
            Role::QualityOfficer => "Quality and patient safety officer",
            Role::Pharmacist => "Clinical pharmacist",
        }
    }
}
