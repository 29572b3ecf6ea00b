//! JSON-file-backed profile store.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use remindbot_types::UserProfile;

use crate::{ProfileStore, Result};

/// Profile store persisted as a single JSON document.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous version intact.
pub struct JsonFileStore {
    path: PathBuf,
    profiles: Mutex<BTreeMap<i64, UserProfile>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged, moved aside, and also yields an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let profiles = load_profiles(path);
        info!(
            path = %path.display(),
            profiles = profiles.len(),
            "Reminder store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            profiles: Mutex::new(profiles),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, profiles: &BTreeMap<i64, UserProfile>) -> Result<()> {
        let document: BTreeMap<String, &UserProfile> = profiles
            .iter()
            .map(|(id, profile)| (id.to_string(), profile))
            .collect();
        let bytes = serde_json::to_vec_pretty(&document)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await??;
        debug!(path = %self.path.display(), "Reminder store saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn get(&self, user_id: i64) -> Option<UserProfile> {
        self.profiles.lock().await.get(&user_id).cloned()
    }

    async fn set(&self, profile: UserProfile) -> Result<()> {
        let mut profiles = self.profiles.lock().await;
        profiles.insert(profile.user_id, profile);
        self.persist(&profiles).await
    }

    async fn delete(&self, user_id: i64) -> Result<bool> {
        let mut profiles = self.profiles.lock().await;
        if profiles.remove(&user_id).is_none() {
            return Ok(false);
        }
        self.persist(&profiles).await?;
        Ok(true)
    }

    async fn list(&self) -> Vec<UserProfile> {
        self.profiles.lock().await.values().cloned().collect()
    }
}

fn load_profiles(path: &Path) -> BTreeMap<i64, UserProfile> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No reminder store yet, starting empty");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), "Failed to read reminder store, starting empty: {e}");
            return BTreeMap::new();
        }
    };

    let document: BTreeMap<String, UserProfile> = match serde_json::from_slice(&content) {
        Ok(document) => document,
        Err(e) => {
            warn!(path = %path.display(), "Corrupt reminder store, starting empty: {e}");
            quarantine(path);
            return BTreeMap::new();
        }
    };

    let mut profiles = BTreeMap::new();
    for (key, mut profile) in document {
        match key.parse::<i64>() {
            Ok(user_id) => {
                profile.user_id = user_id;
                profiles.insert(user_id, profile);
            }
            Err(_) => warn!(key, "Skipping profile with non-numeric user id"),
        }
    }
    profiles
}

/// Move a corrupt file out of the way so the next save doesn't destroy it.
fn quarantine(path: &Path) {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let target = sibling(path, &format!("corrupt-{stamp}"));
    match std::fs::rename(path, &target) {
        Ok(()) => warn!(target = %target.display(), "Corrupt reminder store moved aside"),
        Err(e) => warn!("Failed to move corrupt reminder store aside: {e}"),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = sibling(path, "tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remindbot_types::{ReminderDefinition, ReminderKind, ReminderTime, WeekdayCode};

    fn reminder(id: &str, day: WeekdayCode, kind: ReminderKind) -> ReminderDefinition {
        ReminderDefinition {
            id: id.into(),
            text: "Take pills".into(),
            time: ReminderTime::new(22, 30).unwrap(),
            kind,
            day,
            chat_id: 100,
            photo_reference: (kind == ReminderKind::Photo).then(|| "AgACphoto".to_string()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("reminders.json")).unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");

        let mut rico = UserProfile::new(42, "Rico");
        rico.reminders.push(reminder("a", WeekdayCode::Mon, ReminderKind::Text));
        rico.reminders.push(reminder("b", WeekdayCode::Every, ReminderKind::Photo));
        let anna = UserProfile::new(7, "Anna");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set(rico.clone()).await.unwrap();
            store.set(anna.clone()).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().await, vec![anna, rico.clone()]);
        assert_eq!(reopened.get(42).await.unwrap(), rico);
    }

    #[tokio::test]
    async fn test_file_layout_keyed_by_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let store = JsonFileStore::open(&path).unwrap();

        let mut profile = UserProfile::new(42, "Rico");
        profile
            .reminders
            .push(reminder("a", WeekdayCode::Wed, ReminderKind::Text));
        store.set(profile).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["42"]["name"], "Rico");
        assert_eq!(raw["42"]["reminders"][0]["time"], "22:30");
        assert_eq!(raw["42"]["reminders"][0]["day"], "wed");
        assert!(!dir.path().join("reminders.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty_and_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list().await.is_empty());
        assert!(!path.exists());

        let aside = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains("corrupt"));
        assert!(aside);
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set(UserProfile::new(1, "A")).await.unwrap();
        store.set(UserProfile::new(2, "B")).await.unwrap();

        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());

        let reopened = JsonFileStore::open(&path).unwrap();
        let ids: Vec<i64> = reopened.list().await.iter().map(|p| p.user_id).collect();
        assert_eq!(ids, [2]);
    }

    #[tokio::test]
    async fn test_non_numeric_key_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(
            &path,
            r#"{"abc": {"name": "X", "reminders": []}, "5": {"name": "Y", "reminders": []}}"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let profiles = store.list().await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].user_id, 5);
        assert_eq!(profiles[0].name, "Y");
    }
}
