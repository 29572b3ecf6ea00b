//! Sends fired reminders through the messenger, retrying transient failures.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use remindbot_config::DeliveryConfig;
use remindbot_cron::FiredJob;
use remindbot_types::ReminderPayload;

use crate::messenger::Messenger;

/// Exponential backoff between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

impl From<&DeliveryConfig> for RetryPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_secs(60),
        }
    }
}

async fn send_once(messenger: &dyn Messenger, payload: &ReminderPayload) -> anyhow::Result<()> {
    match payload {
        ReminderPayload::Text { chat_id, text } => messenger.send_text(*chat_id, text, None).await,
        ReminderPayload::Photo {
            chat_id,
            photo_reference,
            caption,
        } => messenger.send_photo(*chat_id, photo_reference, caption).await,
    }
}

/// Deliver `payload`, retrying up to `policy.max_attempts` times.
///
/// Returns the last error if every attempt failed.
pub async fn deliver(
    messenger: &dyn Messenger,
    payload: &ReminderPayload,
    policy: &RetryPolicy,
) -> anyhow::Result<()> {
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match send_once(messenger, payload).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    chat_id = payload.chat_id(),
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Reminder delivery failed, retrying: {e}"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
        }
    }
}

/// Consume fired jobs until `cancel` fires or the channel closes.
///
/// Each delivery runs in its own task so a slow retry doesn't hold up others.
pub async fn run_delivery_loop(
    messenger: Arc<dyn Messenger>,
    mut fired_rx: mpsc::UnboundedReceiver<FiredJob>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) {
    info!("Reminder delivery loop started");

    loop {
        let fired = tokio::select! {
            _ = cancel.cancelled() => break,
            fired = fired_rx.recv() => fired,
        };
        let Some(fired) = fired else {
            break;
        };

        let messenger = messenger.clone();
        tokio::spawn(async move {
            if let Err(e) = deliver(messenger.as_ref(), &fired.payload, &policy).await {
                warn!(
                    job_id = %fired.id,
                    chat_id = fired.payload.chat_id(),
                    attempts = policy.max_attempts,
                    "Reminder dropped after retries: {e}"
                );
            }
        });
    }

    info!("Reminder delivery loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingMessenger, Sent};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let messenger = RecordingMessenger::failing_first(2);
        let payload = ReminderPayload::Text {
            chat_id: 9,
            text: "⏰ Pills".into(),
        };

        deliver(&messenger, &payload, &policy(3)).await.unwrap();

        assert_eq!(messenger.attempts(), 3);
        assert_eq!(
            messenger.sent().await,
            [Sent::Text {
                chat_id: 9,
                text: "⏰ Pills".into(),
                keyboard: None
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let messenger = RecordingMessenger::failing_first(10);
        let payload = ReminderPayload::Photo {
            chat_id: 9,
            photo_reference: "file".into(),
            caption: "⏰ Foto".into(),
        };

        assert!(deliver(&messenger, &payload, &policy(3)).await.is_err());
        assert_eq!(messenger.attempts(), 3);
        assert!(messenger.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_policy_from_config() {
        let config = DeliveryConfig {
            max_attempts: 0,
            initial_backoff_ms: 500,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_loop_delivers_fired_jobs() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_delivery_loop(
            messenger.clone(),
            rx,
            policy(1),
            cancel.clone(),
        ));

        tx.send(FiredJob {
            id: "j".into(),
            scheduled_for: chrono::Utc::now(),
            payload: ReminderPayload::Photo {
                chat_id: 3,
                photo_reference: "file".into(),
                caption: "⏰ Foto".into(),
            },
        })
        .unwrap();

        for _ in 0..50 {
            if !messenger.sent().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            messenger.sent().await,
            [Sent::Photo {
                chat_id: 3,
                photo_reference: "file".into(),
                caption: "⏰ Foto".into()
            }]
        );

        cancel.cancel();
        handle.await.unwrap();
    }
}
