use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use remindbot_types::UserProfile;

use crate::{ProfileStore, Result};

/// Non-durable store, used in tests and when no data file is wanted.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<BTreeMap<i64, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.user_id, p)).collect()),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, user_id: i64) -> Option<UserProfile> {
        self.profiles.read().await.get(&user_id).cloned()
    }

    async fn set(&self, profile: UserProfile) -> Result<()> {
        self.profiles.write().await.insert(profile.user_id, profile);
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<bool> {
        Ok(self.profiles.write().await.remove(&user_id).is_some())
    }

    async fn list(&self) -> Vec<UserProfile> {
        self.profiles.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.get(1).await.is_none());

        store.set(UserProfile::new(1, "Rico")).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().name, "Rico");

        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_ordered_by_user() {
        let store = MemoryStore::with_profiles([
            UserProfile::new(9, "B"),
            UserProfile::new(3, "A"),
        ]);
        let ids: Vec<i64> = store.list().await.iter().map(|p| p.user_id).collect();
        assert_eq!(ids, [3, 9]);
    }
}
