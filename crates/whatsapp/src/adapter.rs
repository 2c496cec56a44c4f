use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Client,
    serde::Deserialize,
    tracing::{info, warn},
};

use switchboard_channels::{
    ChannelAdapter, ChannelConnection, ChannelType, Error, ProviderIdentity, Result, SendReceipt,
};

use crate::{DEFAULT_GRAPH_BASE_URL, api, phone::normalize_phone};

const PROVIDER: &str = "whatsapp";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Graph API adapter. The connection's `channel_account_id` is the
/// phone_number_id issued during OAuth setup.
pub struct WhatsAppAdapter {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
    #[serde(default)]
    contacts: Vec<SentContact>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SentContact {
    wa_id: String,
}

impl WhatsAppAdapter {
    /// Adapter against the production Graph API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_GRAPH_BASE_URL)
    }

    /// Adapter against a custom Graph base URL (tests, proxies).
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

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppAdapter {
    fn channel(&self) -> ChannelType {
        ChannelType::Whatsapp
    }

    async fn validate_credentials(&self, raw: &str) -> Result<ProviderIdentity> {
        let me = api::fetch_me(&self.http, &self.base_url, raw).await?;
        Ok(ProviderIdentity {
            account_id: me.id,
            display_name: me.name,
        })
    }

    /// Webhook delivery is configured once at the Meta app level; nothing
    /// to register per connection.
    async fn register_webhook(
        &self,
        _connection: &ChannelConnection,
        _callback_url: &str,
    ) -> Result<()> {
        Ok(())
    }

    async fn send_message(
        &self,
        connection: &ChannelConnection,
        external_user_id: &str,
        text: &str,
    ) -> Result<SendReceipt> {
        connection.ensure_active()?;
        let access_token = connection.require_access_token()?;
        let phone_number_id = &connection.channel_account_id;
        let to = normalize_phone(external_user_id)?;

        let resp = self
            .http
            .post(format!("{}/{phone_number_id}/messages", self.base_url))
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": {"preview_url": false, "body": text},
            }))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "sendMessage", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(to, %status, "whatsapp send rejected");
            return Err(Error::provider(
                PROVIDER,
                "sendMessage",
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: SendResponse = resp
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, "sendMessage", e))?;
        let message_id = parsed
            .messages
            .first()
            .map(|m| m.id.clone())
            .or_else(|| parsed.contacts.first().map(|c| c.wa_id.clone()))
            .unwrap_or_else(|| "unknown".to_string());

        info!(to, message_id, "whatsapp outbound message sent");
        Ok(SendReceipt { message_id })
    }

    /// Nothing to tear down provider-side; the platform subscription is
    /// app-wide.
    async fn deregister_webhook(&self, _connection: &ChannelConnection) -> Result<()> {
        Ok(())
    }
}
