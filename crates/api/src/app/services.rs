//! Service wiring: remote adapters, repositories and the session registry.

use std::sync::Arc;

use ipcwatch_auth::PermissionMatrix;
use ipcwatch_infra::identity::{InMemoryAuthProvider, RestAuthProvider};
use ipcwatch_infra::store::{InMemoryStore, RestStore};
use ipcwatch_infra::{
    AnalyticsClient, AuthProvider, DataStore, ProfileRepository, RecordRepository,
    SessionRegistry, StoreConfig,
};

/// Everything a handler needs, shared behind one `Arc`.
pub struct AppServices {
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: Arc<SessionRegistry>,
    pub profiles: ProfileRepository,
    pub records: RecordRepository,
    pub analytics: AnalyticsClient,
    pub matrix: PermissionMatrix,
}

impl AppServices {
    pub fn new(store: Arc<dyn DataStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            profiles: ProfileRepository::new(store.clone()),
            records: RecordRepository::new(store.clone()),
            analytics: AnalyticsClient::new(store.clone()),
            sessions: Arc::new(SessionRegistry::new()),
            matrix: PermissionMatrix::standard().clone(),
            store,
            auth,
        }
    }

    /// Production wiring against the hosted store and auth service.
    pub fn remote(config: &StoreConfig) -> anyhow::Result<Self> {
        let store = RestStore::new(config)?;
        let auth = RestAuthProvider::new(config)?;
        tracing::info!(url = %config.url, "remote store configured");
        Ok(Self::new(Arc::new(store), Arc::new(auth)))
    }

    /// Fully in-process wiring for tests and local development.
    pub fn in_memory(store: Arc<InMemoryStore>, auth: Arc<InMemoryAuthProvider>) -> Self {
        Self::new(store, auth)
    }
}
