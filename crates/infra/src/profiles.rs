//! `profiles` table access.

use std::sync::Arc;

use serde_json::{Value, json};

use ipcwatch_auth::UserProfile;
use ipcwatch_core::{AuthUserId, ProfileId};

use crate::store::{DataStore, Direction, Filter, StoreError};

pub const PROFILES_TABLE: &str = "profiles";

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DataStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Every profile row linked to a login identity, active or not.
    pub async fn for_identity(&self, auth_user_id: AuthUserId) -> Result<Vec<UserProfile>, StoreError> {
        let rows = self
            .store
            .select(
                PROFILES_TABLE,
                &Filter::new().eq("auth_user_id", auth_user_id),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn get(&self, id: ProfileId) -> Result<Option<UserProfile>, StoreError> {
        let rows = self
            .store
            .select(PROFILES_TABLE, &Filter::new().eq("id", id).limit(1))
            .await?;
        Ok(decode_all(rows)?.into_iter().next())
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = self
            .store
            .select(
                PROFILES_TABLE,
                &Filter::new().order_by("full_name", Direction::Asc),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn insert(&self, profile: &UserProfile) -> Result<UserProfile, StoreError> {
        let row = serde_json::to_value(profile).map_err(|e| StoreError::Decode(e.to_string()))?;
        decode(self.store.insert(PROFILES_TABLE, row).await?)
    }

    /// Persist the mutable columns of `profile`.
    pub async fn save(&self, profile: &UserProfile) -> Result<UserProfile, StoreError> {
        let patch = json!({
            "full_name": profile.full_name,
            "phone": profile.phone,
            "role": profile.role,
            "department": profile.department,
            "active": profile.active,
            "updated_at": profile.updated_at,
        });
        let row = self
            .store
            .update(PROFILES_TABLE, &profile.id.to_string(), patch)
            .await?;
        decode(row)
    }

    pub async fn delete(&self, id: ProfileId) -> Result<(), StoreError> {
        self.store.delete(PROFILES_TABLE, &id.to_string()).await
    }
}

fn decode(row: Value) -> Result<UserProfile, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(format!("profile row: {e}")))
}

fn decode_all(rows: Vec<Value>) -> Result<Vec<UserProfile>, StoreError> {
    rows.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::Utc;
    use ipcwatch_auth::Role;
    use ipcwatch_core::Department;

    fn profile(auth_user_id: AuthUserId, name: &str) -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: ProfileId::new(),
            auth_user_id,
            full_name: name.to_string(),
            email: format!("{}@hospital.org", name.to_lowercase()),
            phone: None,
            role: Role::StaffNurse,
            department: Department::Icu,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_find_save_delete() {
        let repo = ProfileRepository::new(Arc::new(InMemoryStore::new()));
        let uid = AuthUserId::new();
        let p = repo.insert(&profile(uid, "Zainab")).await.unwrap();
        repo.insert(&profile(AuthUserId::new(), "Abel")).await.unwrap();

        let mine = repo.for_identity(uid).await.unwrap();
        assert_eq!(mine, vec![p.clone()]);

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.full_name).collect();
        assert_eq!(names, vec!["Abel", "Zainab"]);

        let mut changed = p.clone();
        changed.role = Role::HeadNurse;
        changed.active = false;
        let saved = repo.save(&changed).await.unwrap();
        assert_eq!(saved.role, Role::HeadNurse);
        assert!(!repo.get(p.id).await.unwrap().unwrap().active);

        repo.delete(p.id).await.unwrap();
        assert!(repo.get(p.id).await.unwrap().is_none());
    }
}
