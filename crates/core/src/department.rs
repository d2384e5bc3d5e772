//! Hospital departments (wards and units) a profile can belong to.

use crate::catalogue_enum;

catalogue_enum! {
    /// One of the 19 departments recognised by the surveillance programme.
    pub enum Department {
        Icu => "ICU",
        Nicu => "NICU",
        Picu => "PICU",
        Ccu => "CCU",
        Emergency => "EMERGENCY",
        GeneralSurgery => "GENERAL_SURGERY",
        InternalMedicine => "INTERNAL_MEDICINE",
        Pediatrics => "PEDIATRICS",
        ObstetricsGynecology => "OBSTETRICS_GYNECOLOGY",
        Orthopedics => "ORTHOPEDICS",
        Neurosurgery => "NEUROSURGERY",
        CardiacSurgery => "CARDIAC_SURGERY",
        Oncology => "ONCOLOGY",
        Hematology => "HEMATOLOGY",
        NephrologyDialysis => "NEPHROLOGY_DIALYSIS",
        BurnUnit => "BURN_UNIT",
        OperatingTheatre => "OPERATING_THEATRE",
        Laboratory => "LABORATORY",
        IpcUnit => "IPC_UNIT",
    }
}
