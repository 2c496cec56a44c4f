use async_trait::async_trait;

use crate::{connection::ChannelConnection, error::Result, types::ChannelType};

/// A single inbound message, normalized across providers.
///
/// This is the only shape the conversation router ever sees; webhook
/// gateways produce it from whatever the provider delivered.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InboundMessage {
    pub channel: ChannelType,
    pub organization_id: String,
    /// Channel-scoped end-user identity: `+5511...` for WhatsApp, the
    /// numeric chat id for Telegram, the bare number for Evolution.
    pub external_user_id: String,
    pub text: String,
    /// Provider message id, when one was delivered.
    pub external_message_id: Option<String>,
    /// Display name of the sender, when the provider includes one.
    pub sender_name: Option<String>,
}

/// Identity reported by a provider when credentials are validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Provider-assigned account id (bot id, app-scoped user id, ...).
    pub account_id: String,
    /// Human-readable account name, when reported.
    pub display_name: Option<String>,
}

/// Receipt for a dispatched outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-assigned message id, or "unknown" when the provider did
    /// not return one.
    pub message_id: String,
}

/// Uniform capability set every provider adapter implements.
///
/// Adapters perform exactly one network call per operation and never retry;
/// provider failures come back as [`crate::Error::Provider`] and retry
/// policy belongs to the caller.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Which channel this adapter serves.
    fn channel(&self) -> ChannelType;

    /// Validate raw credentials (bot token, access token, instance name)
    /// against the provider and return the identity they belong to.
    async fn validate_credentials(&self, raw: &str) -> Result<ProviderIdentity>;

    /// Register the webhook callback for a connection. A no-op for
    /// providers whose webhook subscription is platform-side.
    async fn register_webhook(&self, connection: &ChannelConnection, callback_url: &str)
    -> Result<()>;

    /// Send a text message to an external user. Fire-once.
    async fn send_message(
        &self,
        connection: &ChannelConnection,
        external_user_id: &str,
        text: &str,
    ) -> Result<SendReceipt>;

    /// Remove the webhook registration for a connection.
    async fn deregister_webhook(&self, connection: &ChannelConnection) -> Result<()>;
}
