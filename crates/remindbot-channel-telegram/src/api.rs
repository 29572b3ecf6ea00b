//! Telegram Bot API HTTP client.

use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{
    AnswerCallbackQueryParams, ApiResponse, BotInfo, EditMessageReplyMarkupParams,
    EditMessageTextParams, GetUpdatesParams, SendMessageParams, SendPhotoParams,
    SetMyCommandsParams, TgMessage, Update,
};

/// Telegram rejects edits that would leave a message unchanged with this
/// description. Re-rendering the same menu is not an error for us.
const NOT_MODIFIED: &str = "message is not modified";

/// HTTP client for the Telegram Bot API.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with the given bot token.
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        Self::with_base_url(format!("https://api.telegram.org/bot{bot_token}"))
    }

    fn with_base_url(base_url: String) -> anyhow::Result<Self> {
        // Longer than the getUpdates long-poll timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// POST `params` to `method` and unwrap the `ApiResponse` envelope.
    async fn call<P, R>(&self, method: &str, params: &P) -> anyhow::Result<Option<R>>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp: ApiResponse<R> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} response parse failed"))?;

        if !resp.ok {
            bail!(
                "{method} failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(resp.result)
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> anyhow::Result<BotInfo> {
        self.call("getMe", &serde_json::json!({}))
            .await?
            .context("getMe returned no result")
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdatesParams) -> anyhow::Result<Vec<Update>> {
        Ok(self.call("getUpdates", params).await?.unwrap_or_default())
    }

    /// Register bot commands in the menu.
    pub async fn set_my_commands(&self, params: &SetMyCommandsParams) -> anyhow::Result<()> {
        self.call::<_, bool>("setMyCommands", params).await?;
        Ok(())
    }

    /// Send a text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<TgMessage> {
        self.call("sendMessage", params)
            .await?
            .context("sendMessage returned no result")
    }

    /// Send a photo by `file_id`.
    pub async fn send_photo(&self, params: &SendPhotoParams) -> anyhow::Result<TgMessage> {
        self.call("sendPhoto", params)
            .await?
            .context("sendPhoto returned no result")
    }

    /// Edit an existing message's text and keyboard.
    pub async fn edit_message_text(&self, params: &EditMessageTextParams) -> anyhow::Result<()> {
        ignore_not_modified(self.call::<_, serde_json::Value>("editMessageText", params).await)
    }

    /// Replace only the inline keyboard of an existing message.
    pub async fn edit_message_reply_markup(
        &self,
        params: &EditMessageReplyMarkupParams,
    ) -> anyhow::Result<()> {
        ignore_not_modified(
            self.call::<_, serde_json::Value>("editMessageReplyMarkup", params)
                .await,
        )
    }

    /// Stop the loading indicator on a pressed inline button.
    pub async fn answer_callback_query(
        &self,
        params: &AnswerCallbackQueryParams,
    ) -> anyhow::Result<()> {
        self.call::<_, bool>("answerCallbackQuery", params).await?;
        Ok(())
    }
}

fn ignore_not_modified<T>(result: anyhow::Result<T>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains(NOT_MODIFIED) => Ok(()),
        Err(e) => Err(e),
    }
}
