use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::ChannelType,
};

/// Connection lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
    Pending,
}

impl ConnectionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Pending => "pending",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "connected" => Ok(ConnectionStatus::Connected),
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "error" => Ok(ConnectionStatus::Error),
            "pending" => Ok(ConnectionStatus::Pending),
            other => Err(Error::invalid_input(format!(
                "unknown connection status: {other}"
            ))),
        }
    }
}

/// Flexible credential bag stored with every connection. Which fields are
/// populated depends on the channel (bearer token for WhatsApp, bot token
/// for Telegram, webhook token everywhere).
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    /// Unix ms when the access token expires, if the provider reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Credentials {
    /// Whether the access token has an expiry in the past.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| now_ms >= at)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_token", &self.webhook_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// A persisted per-(organization, channel) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConnection {
    pub id: String,
    pub organization_id: String,
    pub channel: ChannelType,
    /// Provider-assigned identity: phone_number_id, `@botusername`, or the
    /// Evolution instance name.
    pub channel_account_id: String,
    pub credentials: Credentials,
    /// Provider-specific free-form metadata.
    pub channel_metadata: serde_json::Value,
    pub status: ConnectionStatus,
    pub connected_at: i64,
    pub last_sync_at: Option<i64>,
    pub error_message: Option<String>,
}

impl ChannelConnection {
    /// The bearer access token, or an error naming the missing field.
    pub fn require_access_token(&self) -> Result<&str> {
        self.credentials
            .access_token
            .as_deref()
            .ok_or_else(|| Error::invalid_input(format!("missing access_token for {}", self.channel)))
    }

    /// The static API key (Telegram bot token), or an error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.credentials
            .api_key
            .as_deref()
            .ok_or_else(|| Error::invalid_input(format!("missing api_key for {}", self.channel)))
    }

    /// The per-connection webhook token, or an error.
    pub fn require_webhook_token(&self) -> Result<&str> {
        self.credentials
            .webhook_token
            .as_deref()
            .ok_or_else(|| Error::invalid_input(format!("missing webhook_token for {}", self.channel)))
    }

    /// A string field from the metadata blob, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.channel_metadata.get(key).and_then(|v| v.as_str())
    }

    /// A required string field from the metadata blob.
    pub fn require_metadata(&self, key: &str) -> Result<&str> {
        self.metadata_str(key).ok_or_else(|| {
            Error::invalid_input(format!("missing metadata field '{key}' for {}", self.channel))
        })
    }

    /// Error unless this connection is in the `connected` state.
    pub fn ensure_active(&self) -> Result<()> {
        if self.status == ConnectionStatus::Connected {
            Ok(())
        } else {
            Err(Error::not_connected(self.channel, self.status))
        }
    }
}

/// Input to [`crate::store::ConnectionStore::upsert`].
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub organization_id: String,
    pub channel: ChannelType,
    pub channel_account_id: String,
    pub credentials: Credentials,
    pub channel_metadata: serde_json::Value,
    pub status: ConnectionStatus,
    pub error_message: Option<String>,
}
