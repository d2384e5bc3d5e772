//! Infrastructure layer: remote store and auth service adapters, config,
//! repositories and the live session registry.

pub mod analytics;
pub mod config;
pub mod identity;
pub mod profiles;
pub mod records;
pub mod sessions;
pub mod store;

pub use analytics::{AnalyticsClient, AnalyticsError, AnalyticsKind, AnalyticsRequest, DateRange};
pub use config::{ConfigError, ServerConfig, StoreConfig};
pub use identity::{AuthProvider, AuthProviderError, AuthSession};
pub use profiles::ProfileRepository;
pub use records::{RecordError, RecordQuery, RecordRepository};
pub use sessions::{ActiveSession, RegistryError, SessionRegistry, SessionToken};
pub use store::{DataStore, Filter, StoreError};
