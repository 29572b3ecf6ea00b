//! Telegram transport for remindbot.
//!
//! Uses the Telegram Bot API with long-polling (no webhook required).
//! Inline keyboards are sent as `InlineKeyboardMarkup`; button presses come
//! back as callback queries.

pub mod api;
pub mod polling;
pub mod types;

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use remindbot_gateway::{BotChannel, Messenger};
use remindbot_types::{InboundEvent, Keyboard};

use api::TelegramApi;
use types::{
    AnswerCallbackQueryParams, BotCommand, EditMessageReplyMarkupParams, EditMessageTextParams,
    InlineKeyboardMarkup, SendMessageParams, SendPhotoParams, SetMyCommandsParams,
};

/// Telegram channel implementing `BotChannel`.
pub struct TelegramChannel {
    api: Arc<TelegramApi>,
    state: Mutex<PollState>,
}

#[derive(Default)]
struct PollState {
    cancel: Option<CancellationToken>,
    poll_handle: Option<JoinHandle<()>>,
}

impl TelegramChannel {
    /// Create a channel for the bot identified by `bot_token`.
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            api: Arc::new(TelegramApi::new(bot_token)?),
            state: Mutex::new(PollState::default()),
        })
    }
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        self.api
            .send_message(&SendMessageParams {
                chat_id,
                text: text.to_string(),
                reply_markup: keyboard.map(InlineKeyboardMarkup::from),
            })
            .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_reference: &str,
        caption: &str,
    ) -> anyhow::Result<()> {
        self.api
            .send_photo(&SendPhotoParams {
                chat_id,
                photo: photo_reference.to_string(),
                caption: (!caption.is_empty()).then(|| caption.to_string()),
            })
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        self.api
            .edit_message_text(&EditMessageTextParams {
                chat_id,
                message_id,
                text: text.to_string(),
                reply_markup: keyboard.map(InlineKeyboardMarkup::from),
            })
            .await
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()> {
        self.api
            .edit_message_reply_markup(&EditMessageReplyMarkupParams {
                chat_id,
                message_id,
                reply_markup: InlineKeyboardMarkup::from(keyboard),
            })
            .await
    }

    async fn answer_callback(&self, query_id: &str) -> anyhow::Result<()> {
        self.api
            .answer_callback_query(&AnswerCallbackQueryParams {
                callback_query_id: query_id.to_string(),
            })
            .await
    }
}

#[async_trait]
impl BotChannel for TelegramChannel {
    fn channel_type(&self) -> &str {
        "telegram"
    }

    async fn start(&self, sender: mpsc::Sender<InboundEvent>) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.poll_handle.is_some() {
            bail!("Telegram channel is already running");
        }

        let bot = self
            .api
            .get_me()
            .await
            .context("Failed to authenticate Telegram bot")?;
        info!(
            bot_username = bot.username.as_deref().unwrap_or("unknown"),
            "Telegram bot authenticated"
        );

        let commands = SetMyCommandsParams {
            commands: vec![BotCommand {
                command: "start".into(),
                description: "Avvia il bot".into(),
            }],
        };
        if let Err(e) = self.api.set_my_commands(&commands).await {
            warn!("Failed to register bot commands: {e}");
        }

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let api = self.api.clone();

        let handle = tokio::spawn(async move {
            polling::run_polling_loop(&api, sender, cancel_child).await;
        });

        state.cancel = Some(cancel);
        state.poll_handle = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        if let Some(handle) = state.poll_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}
