use serde::Deserialize;

/// Webhook event envelope delivered by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    /// Event name, e.g. `messages.upsert` or `connection.update`.
    pub event: String,
    pub instance: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventPayload {
    /// Parse the data block of a `messages.upsert` event.
    #[must_use]
    pub fn message_data(&self) -> Option<MessageData> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Parse the data block of a `connection.update` event.
    #[must_use]
    pub fn connection_update(&self) -> Option<ConnectionUpdateData> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// `messages.upsert` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageData {
    pub key: MessageKey,
    #[serde(default, rename = "pushName")]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<MessageContent>,
}

impl MessageData {
    /// Plain-text body, when this is a conversation message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref()?.conversation.as_deref()
    }

    /// The sender's number: digits of the JID before the `@` suffix.
    #[must_use]
    pub fn sender_number(&self) -> Option<&str> {
        let jid = self.key.remote_jid.as_str();
        let number = jid.split('@').next()?;
        if number.is_empty() { None } else { Some(number) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageKey {
    #[serde(rename = "remoteJid")]
    pub remote_jid: String,
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub conversation: Option<String>,
}

/// `connection.update` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionUpdateData {
    pub state: String,
}
