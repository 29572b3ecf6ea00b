//! Seams between the dialog logic and a chat transport.
//!
//! ```text
//! Chat platform
//!     ↓ (platform protocol)
//! BotChannel::start() spawns listener
//!     ↓ (InboundEvent via mpsc)
//! DialogController::handle()
//!     ↓ (replies, keyboards)
//! Messenger methods
//!     ↓ (platform protocol)
//! Chat platform
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use remindbot_types::{InboundEvent, Keyboard};

/// Outbound operations on a chat.
///
/// Errors (network, rate limits) are returned to the caller; the delivery
/// loop decides whether to retry.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally with an inline keyboard.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()>;

    /// Send a previously uploaded photo by its transport reference.
    async fn send_photo(
        &self,
        chat_id: i64,
        photo_reference: &str,
        caption: &str,
    ) -> anyhow::Result<()>;

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()>;

    /// Replace only the inline keyboard of an earlier message.
    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &Keyboard,
    ) -> anyhow::Result<()>;

    /// Acknowledge a button press.
    async fn answer_callback(&self, query_id: &str) -> anyhow::Result<()>;
}

/// A chat transport that can also listen for inbound events.
///
/// Use `&self` for all methods; implementations keep mutable state behind
/// interior mutability.
#[async_trait]
pub trait BotChannel: Messenger {
    /// Transport identifier (e.g. "telegram").
    fn channel_type(&self) -> &str;

    /// Connect and start pushing inbound events into `sender`.
    async fn start(&self, sender: mpsc::Sender<InboundEvent>) -> anyhow::Result<()>;

    /// Disconnect. Safe to call when not running.
    async fn stop(&self) -> anyhow::Result<()>;
}
