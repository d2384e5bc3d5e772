//! `ipcwatch-core`: shared domain vocabulary.
//!
//! Identifiers, the domain error model, and the hospital catalogues
//! (departments, surveillance form types) every other crate speaks in.
//! No IO lives here.

pub mod catalogue;
pub mod department;
pub mod error;
pub mod form_type;
pub mod id;

pub use department::Department;
pub use error::DomainError;
pub use form_type::FormType;
pub use id::{AuthUserId, ProfileId, RecordId};
