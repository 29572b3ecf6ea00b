//! remindbot-cron: weekly reminder scheduling.
//!
//! A job pairs a [`TriggerSpec`] (weekday or every day, hour, minute,
//! timezone) with the payload to deliver. Jobs fire at every matching local
//! wall-clock occurrence until removed; each firing is emitted as a
//! [`FiredJob`] on a channel for the delivery side to send.

pub mod scheduler;
pub mod trigger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use remindbot_types::{ReminderDefinition, ReminderPayload};

pub use scheduler::CronScheduler;
pub use trigger::TriggerSpec;

#[derive(Debug, thiserror::Error)]
pub enum CronError {
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("trigger for job {0} never fires")]
    NeverFires(String),
    #[error("unknown timezone: {0}")]
    Timezone(String),
    #[error("scheduler is shut down")]
    ShutDown,
}

/// A job registration: id, when to fire, and what to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledJob {
    pub id: String,
    pub trigger: TriggerSpec,
    pub payload: ReminderPayload,
}

impl ScheduledJob {
    /// The job backing a stored reminder, evaluated in `timezone`.
    pub fn for_reminder(reminder: &ReminderDefinition, timezone: Tz) -> Self {
        Self {
            id: reminder.id.clone(),
            trigger: TriggerSpec::new(reminder.day, reminder.time, timezone),
            payload: reminder.payload(),
        }
    }
}

/// Emitted each time a job's trigger matches.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredJob {
    pub id: String,
    pub scheduled_for: DateTime<Utc>,
    pub payload: ReminderPayload,
}

/// Holds live jobs and fires them until removed.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Register a job, replacing any job with the same id.
    async fn add_job(&self, job: ScheduledJob) -> Result<(), CronError>;

    /// Remove a job. Returns `CronError::JobNotFound` if no such job is live.
    async fn remove_job(&self, id: &str) -> Result<(), CronError>;

    /// Ids of all live jobs, sorted.
    async fn job_ids(&self) -> Vec<String>;
}

/// Parse an IANA timezone name such as `Europe/Rome`.
pub fn parse_timezone(name: &str) -> Result<Tz, CronError> {
    name.parse::<Tz>()
        .map_err(|e| CronError::Timezone(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use remindbot_types::{ReminderKind, ReminderTime, WeekdayCode};

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Rome").unwrap(), chrono_tz::Europe::Rome);
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(CronError::Timezone(_))
        ));
    }

    #[test]
    fn test_job_for_reminder() {
        let reminder = ReminderDefinition {
            id: "1_fri_8_0_text_00ff00ff".into(),
            text: "Stand-up".into(),
            time: ReminderTime::new(8, 0).unwrap(),
            kind: ReminderKind::Text,
            day: WeekdayCode::Fri,
            chat_id: 5,
            photo_reference: None,
        };
        let job = ScheduledJob::for_reminder(&reminder, chrono_tz::Tz::UTC);
        assert_eq!(job.id, reminder.id);
        assert_eq!(job.trigger.day(), WeekdayCode::Fri);
        assert_eq!(job.trigger.time(), reminder.time);
        assert_eq!(
            job.payload,
            ReminderPayload::Text {
                chat_id: 5,
                text: "⏰ Stand-up".into()
            }
        );
    }
}
