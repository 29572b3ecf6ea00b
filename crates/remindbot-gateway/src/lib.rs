//! remindbot-gateway: conversation handling and reminder lifecycle.
//!
//! Provides:
//! - Per-user dialog state machine (name, days, time, message, photo)
//! - Dialog controller wiring the store, the scheduler and the messenger
//! - Restore of scheduler jobs from persisted reminders
//! - Delivery loop with retry for fired reminders
//! - Idle dialog expiry
//! - HTTP liveness endpoint

pub mod actions;
pub mod controller;
pub mod conversation;
pub mod delivery;
pub mod liveness;
pub mod messenger;
pub mod restore;
pub mod sessions;
pub mod ui;

#[cfg(test)]
mod testing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use remindbot_config::RemindBotConfig;
use remindbot_cron::CronScheduler;
use remindbot_storage::JsonFileStore;

pub use controller::{DialogController, DialogSettings};
pub use messenger::{BotChannel, Messenger};

/// Run the bot until Ctrl-C.
///
/// Opens the store, restores scheduled jobs, starts `channel`, and runs the
/// inbound, delivery, idle-expiry and liveness tasks.
pub async fn start_bot<C: BotChannel + 'static>(
    config: RemindBotConfig,
    channel: Arc<C>,
    data_file: &Path,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    let timezone = remindbot_cron::parse_timezone(&config.scheduler.timezone)?;

    let store = Arc::new(
        JsonFileStore::open(data_file)
            .with_context(|| format!("Failed to open store at {}", data_file.display()))?,
    );
    info!("Storage initialized: {}", data_file.display());

    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(CronScheduler::new(fired_tx));
    restore::restore_jobs(store.as_ref(), scheduler.as_ref(), timezone).await;

    let cancel = CancellationToken::new();
    let messenger: Arc<dyn Messenger> = channel.clone();

    tokio::spawn(delivery::run_delivery_loop(
        messenger.clone(),
        fired_rx,
        delivery::RetryPolicy::from(&config.delivery),
        cancel.clone(),
    ));

    let controller = Arc::new(DialogController::new(
        store,
        scheduler.clone(),
        messenger,
        DialogSettings::new(&config.dialog, timezone),
    ));

    if config.dialog.idle_timeout_secs > 0 {
        tokio::spawn(sessions::run_idle_sweeper(
            controller.sessions().clone(),
            Duration::from_secs(config.dialog.idle_timeout_secs),
            cancel.clone(),
        ));
    }

    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    channel
        .start(inbound_tx)
        .await
        .with_context(|| format!("Failed to start {} channel", channel.channel_type()))?;
    tokio::spawn(controller.run_inbound_loop(inbound_rx));

    if config.liveness.enabled {
        let host = config.liveness.host.clone();
        let port = port_override.unwrap_or_else(|| config.liveness_port());
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = liveness::serve(&host, port, cancel).await {
                warn!("Liveness endpoint failed: {e}");
            }
        });
    }

    info!(timezone = %timezone, "remindbot running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    cancel.cancel();
    if let Err(e) = channel.stop().await {
        warn!("Failed to stop channel: {e}");
    }
    scheduler.shutdown().await;
    Ok(())
}
