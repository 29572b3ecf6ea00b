//! Re-registers scheduler jobs for persisted reminders after a restart.

use chrono_tz::Tz;
use tracing::{info, warn};

use remindbot_cron::{JobScheduler, ScheduledJob};
use remindbot_storage::ProfileStore;

/// Outcome of a restore pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
}

/// Schedule one job per stored reminder, reusing its id and payload.
///
/// A reminder that fails to schedule is logged and skipped.
pub async fn restore_jobs(
    store: &dyn ProfileStore,
    scheduler: &dyn JobScheduler,
    timezone: Tz,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for profile in store.list().await {
        for reminder in &profile.reminders {
            match scheduler
                .add_job(ScheduledJob::for_reminder(reminder, timezone))
                .await
            {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user_id = profile.user_id,
                        job_id = %reminder.id,
                        "Failed to restore reminder job: {e}"
                    );
                }
            }
        }
    }

    info!(
        restored = report.restored,
        failed = report.failed,
        "Reminder restore complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reminder, RecordingScheduler};
    use remindbot_storage::MemoryStore;
    use remindbot_types::{UserProfile, WeekdayCode};

    #[tokio::test]
    async fn test_restores_every_reminder() {
        let mut a = UserProfile::new(1, "A");
        a.reminders = vec![
            reminder("a1", WeekdayCode::Mon),
            reminder("a2", WeekdayCode::Tue),
        ];
        let mut b = UserProfile::new(2, "B");
        b.reminders = vec![reminder("b1", WeekdayCode::Every)];
        let empty = UserProfile::new(3, "C");
        let store = MemoryStore::with_profiles([a, b, empty]);
        let scheduler = RecordingScheduler::default();

        let report = restore_jobs(&store, &scheduler, Tz::UTC).await;
        assert_eq!(report, RestoreReport { restored: 3, failed: 0 });
        assert_eq!(scheduler.job_ids().await, ["a1", "a2", "b1"]);

        let jobs = scheduler.jobs().await;
        let b1 = jobs.iter().find(|j| j.id == "b1").unwrap();
        assert_eq!(b1.trigger.day(), WeekdayCode::Every);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_rest() {
        let mut a = UserProfile::new(1, "A");
        a.reminders = vec![
            reminder("a1", WeekdayCode::Mon),
            reminder("broken", WeekdayCode::Tue),
            reminder("a3", WeekdayCode::Wed),
        ];
        let store = MemoryStore::with_profiles([a]);
        let scheduler = RecordingScheduler::failing_on(["broken"]);

        let report = restore_jobs(&store, &scheduler, Tz::UTC).await;
        assert_eq!(report, RestoreReport { restored: 2, failed: 1 });
        assert_eq!(scheduler.job_ids().await, ["a1", "a3"]);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStore::new();
        let scheduler = RecordingScheduler::default();
        assert_eq!(
            restore_jobs(&store, &scheduler, Tz::UTC).await,
            RestoreReport::default()
        );
    }
}
