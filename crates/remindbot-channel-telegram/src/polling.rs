//! Telegram long-polling loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use remindbot_types::{InboundEvent, InboundKind};

use crate::api::TelegramApi;
use crate::types::{GetUpdatesParams, Update};

/// Convert a Telegram update into an inbound event.
///
/// Returns `None` for updates the bot does not react to (stickers, edits,
/// callbacks without data, ...).
pub fn update_to_event(update: Update) -> Option<InboundEvent> {
    if let Some(query) = update.callback_query {
        let data = query.data?;
        let message = query.message.as_ref();
        return Some(InboundEvent {
            user_id: query.from.id,
            chat_id: message.map(|m| m.chat.id).unwrap_or(query.from.id),
            kind: InboundKind::Callback {
                query_id: query.id,
                message_id: message.map(|m| m.message_id),
                data,
            },
        });
    }

    let msg = update.message?;
    let user_id = msg.from.as_ref().map(|u| u.id).unwrap_or(msg.chat.id);

    let kind = if let Some(name) = msg.command() {
        InboundKind::Command {
            name: name.to_string(),
        }
    } else if let Some(file_id) = msg.largest_photo() {
        InboundKind::Photo {
            file_id: file_id.to_string(),
            caption: msg.caption.clone(),
        }
    } else {
        InboundKind::Text(msg.text.clone()?)
    };

    Some(InboundEvent {
        user_id,
        chat_id: msg.chat.id,
        kind,
    })
}

/// Run the long-polling loop, forwarding updates as `InboundEvent`s.
///
/// Exits when `cancel` is cancelled or the `sender` is closed.
pub async fn run_polling_loop(
    api: &TelegramApi,
    sender: mpsc::Sender<InboundEvent>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!("Telegram polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let params = GetUpdatesParams {
            offset,
            timeout: Some(30),
            allowed_updates: Some(vec!["message".into(), "callback_query".into()]),
        };

        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(&params) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);

                for update in updates {
                    let update_id = update.update_id;
                    offset = Some(update_id + 1);

                    let Some(event) = update_to_event(update) else {
                        debug!(update_id, "Ignoring Telegram update");
                        continue;
                    };

                    debug!(
                        update_id,
                        user_id = event.user_id,
                        "Forwarding Telegram update"
                    );

                    if sender.send(event).await.is_err() {
                        info!("Inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(backoff_secs = backoff.as_secs(), "getUpdates error: {e}");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!("Telegram polling loop stopped");
}
