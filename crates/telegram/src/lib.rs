//! Telegram Bot API adapter.
//!
//! One static bot token per connection; webhook delivery is registered
//! explicitly with `setWebhook` and authenticated by a per-connection
//! token embedded in the callback URL.

pub mod adapter;
pub mod api;
pub mod update;

pub use {
    adapter::TelegramAdapter,
    api::BotInfo,
    update::{Update, UpdateMessage},
};

/// Default Bot API base URL.
pub const DEFAULT_BOT_API_BASE_URL: &str = "https://api.telegram.org";
