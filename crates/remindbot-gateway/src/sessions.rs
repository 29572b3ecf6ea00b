//! Per-user dialog state with one lock per user.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::conversation::DialogStep;

/// Transient state for one user. Never persisted.
#[derive(Debug)]
pub struct UserSession {
    pub step: Option<DialogStep>,
    last_active: Instant,
}

impl UserSession {
    fn new() -> Self {
        Self {
            step: None,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// Holds every user's session behind its own mutex.
///
/// Events for the same user lock the same session, so they are applied one
/// at a time; events for different users proceed independently.
#[derive(Default)]
pub struct ConversationRegistry {
    sessions: RwLock<HashMap<i64, Arc<Mutex<UserSession>>>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `user_id`, created on first use.
    pub async fn session(&self, user_id: i64) -> Arc<Mutex<UserSession>> {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return session.clone();
        }
        self.sessions
            .write()
            .await
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::new())))
            .clone()
    }

    /// Current step for `user_id`, if any.
    pub async fn step(&self, user_id: i64) -> Option<DialogStep> {
        let session = self.sessions.read().await.get(&user_id).cloned()?;
        let session = session.lock().await;
        session.step.clone()
    }

    /// Drop sessions idle longer than `max_idle`. Returns how many dialogs
    /// were abandoned.
    ///
    /// A session someone else still holds a handle to is in use and is kept.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut abandoned = 0;
        sessions.retain(|_, session| {
            if Arc::strong_count(session) > 1 {
                return true;
            }
            let Ok(guard) = session.try_lock() else {
                return true;
            };
            if guard.idle_for() <= max_idle {
                return true;
            }
            if guard.step.is_some() {
                abandoned += 1;
            }
            false
        });
        abandoned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically expire idle sessions until `cancel` fires.
pub async fn run_idle_sweeper(
    registry: Arc<ConversationRegistry>,
    max_idle: Duration,
    cancel: CancellationToken,
) {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    info!(max_idle_secs = max_idle.as_secs(), "Idle dialog sweeper started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let abandoned = registry.expire_idle(max_idle).await;
                if abandoned > 0 {
                    debug!(abandoned, "Discarded idle dialogs");
                }
            }
        }
    }
}
