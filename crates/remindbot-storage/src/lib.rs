//! remindbot-storage: persistence for user profiles and their reminders.
//!
//! The whole store is one JSON document mapping the stringified user id to
//! `{name, reminders}`. It is loaded once at startup and rewritten after
//! every mutation.

mod file;
mod memory;

use async_trait::async_trait;

use remindbot_types::UserProfile;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Keyed access to user profiles.
///
/// `set` and `delete` always update the in-memory view. An `Err` means the
/// change was applied but could not be made durable.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by user id.
    async fn get(&self, user_id: i64) -> Option<UserProfile>;

    /// Insert or replace the profile stored under `profile.user_id`.
    async fn set(&self, profile: UserProfile) -> Result<()>;

    /// Remove a profile. Returns whether it existed.
    async fn delete(&self, user_id: i64) -> Result<bool>;

    /// All profiles, ordered by user id.
    async fn list(&self) -> Vec<UserProfile>;
}
