//! Surveillance form types.

use crate::catalogue_enum;

catalogue_enum! {
    /// A kind of surveillance form a profile may create, read or update.
    pub enum FormType {
        /// Catheter-associated urinary tract infection.
        Cauti => "CAUTI",
        /// Central line-associated bloodstream infection.
        Clabsi => "CLABSI",
        /// Daily central-line maintenance bundle checklist.
        ClabsiBundle => "CLABSI_BUNDLE",
        /// Multidrug-resistant organism.
        Mdro => "MDRO",
        /// Surgical site infection.
        Ssi => "SSI",
        /// Ventilator-associated pneumonia (permission tables only).
        Vap => "VAP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_parse() {
        assert_eq!(
            "clabsi-bundle".parse::<FormType>().unwrap(),
            FormType::ClabsiBundle
        );
        assert_eq!("Cauti".parse::<FormType>().unwrap(), FormType::Cauti);
    }

    #[test]
    fn unknown_form_is_an_invalid_id() {
        let err = "HAI".parse::<FormType>().unwrap_err();
        assert!(err.to_string().contains("FormType"));
    }
}
