use std::time::Duration;

use {async_trait::async_trait, reqwest::Client, tracing::info};

use switchboard_channels::{
    ChannelAdapter, ChannelConnection, ChannelType, Error, ProviderIdentity, Result, SendReceipt,
};

use crate::{DEFAULT_BOT_API_BASE_URL, api};

const PROVIDER: &str = "telegram";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Bot API adapter. The connection's `api_key` credential is the bot token.
pub struct TelegramAdapter {
    http: Client,
    base_url: String,
}

impl TelegramAdapter {
    /// Adapter against the production Bot API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BOT_API_BASE_URL)
    }

    /// Adapter against a custom base URL (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER, "buildClient", e))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn parse_chat_id(external_user_id: &str) -> Result<i64> {
        external_user_id
            .parse::<i64>()
            .map_err(|_| Error::invalid_input(format!("invalid telegram chat id: {external_user_id:?}")))
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn channel(&self) -> ChannelType {
        ChannelType::Telegram
    }

    /// `getMe` with the candidate token; the identity must be a bot
    /// account.
    async fn validate_credentials(&self, raw: &str) -> Result<ProviderIdentity> {
        let info = api::get_me(&self.http, &self.base_url, raw).await?;
        if !info.is_bot {
            return Err(Error::invalid_input("token is valid but not for a bot"));
        }
        let username = info
            .username
            .ok_or_else(|| Error::provider(PROVIDER, "getMe", "bot has no username"))?;
        Ok(ProviderIdentity {
            account_id: format!("@{username}"),
            display_name: Some(info.first_name),
        })
    }

    async fn register_webhook(
        &self,
        connection: &ChannelConnection,
        callback_url: &str,
    ) -> Result<()> {
        let bot_token = connection.require_api_key()?;
        api::set_webhook(&self.http, &self.base_url, bot_token, callback_url).await?;
        info!(account_id = %connection.channel_account_id, "telegram webhook registered");
        Ok(())
    }

    async fn send_message(
        &self,
        connection: &ChannelConnection,
        external_user_id: &str,
        text: &str,
    ) -> Result<SendReceipt> {
        connection.ensure_active()?;
        let bot_token = connection.require_api_key()?;
        let chat_id = Self::parse_chat_id(external_user_id)?;

        let sent = api::send_message(&self.http, &self.base_url, bot_token, chat_id, text).await?;
        info!(chat_id, message_id = sent.message_id, "telegram outbound message sent");
        Ok(SendReceipt {
            message_id: sent.message_id.to_string(),
        })
    }

    async fn deregister_webhook(&self, connection: &ChannelConnection) -> Result<()> {
        let bot_token = connection.require_api_key()?;
        api::delete_webhook(&self.http, &self.base_url, bot_token).await
    }
}
