//! Tokio-backed job scheduler: one timer task per live job.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{CronError, FiredJob, JobScheduler, ScheduledJob};

/// Manages live reminder jobs.
///
/// Each job runs in its own task that sleeps until the next occurrence and
/// then sends a [`FiredJob`] on the channel given at construction.
pub struct CronScheduler {
    jobs: RwLock<HashMap<String, LiveJob>>,
    fired_tx: mpsc::UnboundedSender<FiredJob>,
    cancel: CancellationToken,
}

struct LiveJob {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LiveJob {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

impl CronScheduler {
    /// Create a scheduler that emits firings on `fired_tx`.
    pub fn new(fired_tx: mpsc::UnboundedSender<FiredJob>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            fired_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop every job. Later `add_job` calls fail with `CronError::ShutDown`.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut jobs = self.jobs.write().await;
        let count = jobs.len();
        for (_, job) in jobs.drain() {
            job.stop();
        }
        info!(jobs = count, "Cron scheduler stopped");
    }
}

#[async_trait]
impl JobScheduler for CronScheduler {
    async fn add_job(&self, job: ScheduledJob) -> Result<(), CronError> {
        if self.cancel.is_cancelled() {
            return Err(CronError::ShutDown);
        }
        let Some(first) = job.trigger.next_after(Utc::now()) else {
            return Err(CronError::NeverFires(job.id));
        };

        let cancel = self.cancel.child_token();
        let id = job.id.clone();
        let handle = tokio::spawn(run_job(job, self.fired_tx.clone(), cancel.clone()));

        let previous = self
            .jobs
            .write()
            .await
            .insert(id.clone(), LiveJob { cancel, handle });
        if let Some(previous) = previous {
            previous.stop();
            debug!(job_id = %id, "Replaced existing job");
        }

        debug!(job_id = %id, next_run = %first, "Job scheduled");
        Ok(())
    }

    async fn remove_job(&self, id: &str) -> Result<(), CronError> {
        match self.jobs.write().await.remove(id) {
            Some(job) => {
                job.stop();
                debug!(job_id = %id, "Job removed");
                Ok(())
            }
            None => Err(CronError::JobNotFound(id.to_string())),
        }
    }

    async fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn run_job(
    job: ScheduledJob,
    fired_tx: mpsc::UnboundedSender<FiredJob>,
    cancel: CancellationToken,
) {
    let mut cursor = Utc::now();

    loop {
        let Some(next) = job.trigger.next_after(cursor) else {
            warn!(job_id = %job.id, "Trigger has no further occurrences, stopping job");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        info!(job_id = %job.id, scheduled_for = %next, "Firing reminder job");
        let fired = FiredJob {
            id: job.id.clone(),
            scheduled_for: next,
            payload: job.payload.clone(),
        };
        if fired_tx.send(fired).is_err() {
            warn!(job_id = %job.id, "Delivery channel closed, stopping job");
            return;
        }
        cursor = next;
    }
}
