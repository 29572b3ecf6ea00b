//! In-memory fakes shared by the gateway tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use remindbot_cron::{CronError, JobScheduler, ScheduledJob};
use remindbot_types::{Keyboard, ReminderDefinition, ReminderKind, ReminderTime, WeekdayCode};

use crate::messenger::Messenger;

/// One outbound call recorded by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        chat_id: i64,
        photo_reference: String,
        caption: String,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    EditKeyboard {
        chat_id: i64,
        message_id: i64,
        keyboard: Keyboard,
    },
    Answer {
        query_id: String,
    },
}

impl Sent {
    /// Text of a sent or edited message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Text { keyboard, .. } | Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            Sent::EditKeyboard { keyboard, .. } => Some(keyboard),
            _ => None,
        }
    }
}

/// Records every call. `send_text`/`send_photo` can be made to fail a
/// number of times first.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    attempts: AtomicU32,
    fail_first: AtomicU32,
}

impl RecordingMessenger {
    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_first: AtomicU32::new(n),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// The last recorded message or edit, skipping callback answers.
    pub async fn last_reply(&self) -> Option<Sent> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|s| !matches!(s, Sent::Answer { .. }))
            .cloned()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    /// Number of `send_text`/`send_photo` calls, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn record_send(&self, sent: Sent) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("simulated send failure");
        }
        self.sent.lock().await.push(sent);
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        self.record_send(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        })
        .await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_reference: &str,
        caption: &str,
    ) -> anyhow::Result<()> {
        self.record_send(Sent::Photo {
            chat_id,
            photo_reference: photo_reference.to_string(),
            caption: caption.to_string(),
        })
        .await
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        self.sent.lock().await.push(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        self.sent.lock().await.push(Sent::EditKeyboard {
            chat_id,
            message_id,
            keyboard: keyboard.clone(),
        });
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str) -> anyhow::Result<()> {
        self.sent.lock().await.push(Sent::Answer {
            query_id: query_id.to_string(),
        });
        Ok(())
    }
}

/// Keeps jobs in a map instead of running timers. Ids listed in
/// `failing_on` are refused by `add_job`.
#[derive(Default)]
pub struct RecordingScheduler {
    jobs: Mutex<BTreeMap<String, ScheduledJob>>,
    removals: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl RecordingScheduler {
    pub fn failing_on<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing: ids.into_iter().map(String::from).collect(),
            ..Self::default()
        }
    }

    pub async fn jobs(&self) -> Vec<ScheduledJob> {
        self.jobs.lock().await.values().cloned().collect()
    }

    /// Every id passed to `remove_job`, found or not.
    pub async fn removals(&self) -> Vec<String> {
        self.removals.lock().await.clone()
    }
}

#[async_trait]
impl JobScheduler for RecordingScheduler {
    async fn add_job(&self, job: ScheduledJob) -> Result<(), CronError> {
        if self.failing.contains(&job.id) {
            return Err(CronError::NeverFires(job.id));
        }
        self.jobs.lock().await.insert(job.id.clone(), job);
        Ok(())
    }

    async fn remove_job(&self, id: &str) -> Result<(), CronError> {
        self.removals.lock().await.push(id.to_string());
        self.jobs
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CronError::JobNotFound(id.to_string()))
    }

    async fn job_ids(&self) -> Vec<String> {
        self.jobs.lock().await.keys().cloned().collect()
    }
}

/// A text reminder at 09:00 on `day`.
pub fn reminder(id: &str, day: WeekdayCode) -> ReminderDefinition {
    ReminderDefinition {
        id: id.to_string(),
        text: format!("reminder {id}"),
        time: ReminderTime::new(9, 0).unwrap(),
        kind: ReminderKind::Text,
        day,
        chat_id: 100,
        photo_reference: None,
    }
}
