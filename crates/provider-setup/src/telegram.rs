use std::sync::Arc;

use tracing::info;

use {
    switchboard_channels::{
        ChannelAdapter, ChannelType, ConnectionStatus, ConnectionStore, Credentials, Error as ChannelError,
        NewConnection,
    },
    switchboard_common::{OrgContext, token::generate_webhook_token},
    switchboard_telegram::TelegramAdapter,
};

use crate::{error::Result, webhook_url};

/// Result of a completed Telegram connection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TelegramConnectOutcome {
    pub organization_id: String,
    pub bot_username: String,
    pub bot_name: Option<String>,
}

/// Telegram orchestrator: one synchronous step — validate the bot token,
/// persist the connection, register the webhook.
pub struct TelegramSetup {
    connections: Arc<dyn ConnectionStore>,
    adapter: Arc<TelegramAdapter>,
    public_url: String,
}

impl TelegramSetup {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        adapter: Arc<TelegramAdapter>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            connections,
            adapter,
            public_url: public_url.into(),
        }
    }

    pub async fn connect(
        &self,
        ctx: &OrgContext,
        bot_token: &str,
    ) -> Result<TelegramConnectOutcome> {
        // Must be a bot account; the adapter rejects anything else.
        let identity = self.adapter.validate_credentials(bot_token).await?;
        let webhook_token = generate_webhook_token();

        self.connections
            .upsert(NewConnection {
                organization_id: ctx.organization_id.clone(),
                channel: ChannelType::Telegram,
                channel_account_id: identity.account_id.clone(),
                credentials: Credentials {
                    api_key: Some(bot_token.to_string()),
                    webhook_token: Some(webhook_token.clone()),
                    ..Credentials::default()
                },
                channel_metadata: serde_json::json!({
                    "bot_username": identity.account_id.trim_start_matches('@'),
                    "bot_name": identity.display_name,
                }),
                status: ConnectionStatus::Connected,
                error_message: None,
            })
            .await?;

        let connection = self
            .connections
            .get_active(&ctx.organization_id, ChannelType::Telegram)
            .await?
            .ok_or_else(|| ChannelError::not_found(ChannelType::Telegram))?;
        let callback = webhook_url(
            &self.public_url,
            "telegram",
            &format!("token={webhook_token}"),
        );
        self.adapter.register_webhook(&connection, &callback).await?;

        info!(
            organization_id = %ctx.organization_id,
            bot = %identity.account_id,
            "telegram connected"
        );
        Ok(TelegramConnectOutcome {
            organization_id: ctx.organization_id.clone(),
            bot_username: identity.account_id,
            bot_name: identity.display_name,
        })
    }

    /// Remove the provider webhook, then mark the connection disconnected.
    pub async fn disconnect(&self, ctx: &OrgContext) -> Result<()> {
        let connection = self
            .connections
            .get_active(&ctx.organization_id, ChannelType::Telegram)
            .await?
            .ok_or_else(|| ChannelError::not_found(ChannelType::Telegram))?;

        self.adapter.deregister_webhook(&connection).await?;
        self.connections
            .disconnect(&ctx.organization_id, ChannelType::Telegram)
            .await?;
        Ok(())
    }
}
