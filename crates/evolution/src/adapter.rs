use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Client,
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use switchboard_channels::{
    ChannelAdapter, ChannelConnection, ChannelType, Error, ProviderIdentity, Result, SendReceipt,
};

use crate::state::InstanceState;

const PROVIDER: &str = "evolution";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Metadata key holding the instance name on a connection.
pub const METADATA_INSTANCE_NAME: &str = "instance_name";

/// QR fetch pacing. The bridge generates the code asynchronously after
/// instance creation, so the first fetch waits for it to settle and two
/// fallback reads follow. These are illustrative defaults, not contract.
#[derive(Debug, Clone, Copy)]
pub struct QrTiming {
    pub settle: Duration,
    pub retry_delay: Duration,
}

impl Default for QrTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(2000),
            retry_delay: Duration::from_millis(1500),
        }
    }
}

/// QR pairing material for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QrCode {
    /// Base64 PNG of the QR code, without any data-URI prefix.
    pub qrcode: Option<String>,
    /// Numeric pairing code alternative, when the bridge offers one.
    pub pairing_code: Option<String>,
}

impl QrCode {
    fn is_empty(&self) -> bool {
        self.qrcode.is_none() && self.pairing_code.is_none()
    }
}

/// Evolution bridge adapter. One deployment-wide API key; per-connection
/// identity is the instance name carried in connection metadata.
pub struct EvolutionAdapter {
    http: Client,
    base_url: String,
    api_key: String,
    timing: QrTiming,
}

#[derive(Debug, Deserialize)]
struct SendTextResponse {
    #[serde(default)]
    key: Option<SentKey>,
}

#[derive(Debug, Deserialize)]
struct SentKey {
    #[serde(default)]
    id: Option<String>,
}

impl EvolutionAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timing(base_url, api_key, QrTiming::default())
    }

    /// Constructor with explicit QR pacing (tests use zero delays).
    pub fn with_timing(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timing: QrTiming,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER, "buildClient", e))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timing,
        })
    }

    fn instance_name<'a>(connection: &'a ChannelConnection) -> Result<&'a str> {
        connection.require_metadata(METADATA_INSTANCE_NAME)
    }

    async fn get_json(&self, path: &str, operation: &'static str) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, operation, e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                operation,
                format!("HTTP {status}: {body}"),
            ));
        }
        resp.json()
            .await
            .map_err(|e| Error::provider(PROVIDER, operation, e))
    }

    /// Create a named instance with QR pairing enabled.
    pub async fn create_instance(&self, instance_name: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/instance/create", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "instanceName": instance_name,
                "qrcode": true,
                "integration": "WHATSAPP-BAILEYS",
            }))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "createInstance", e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                "createInstance",
                format!("HTTP {status}: {body}"),
            ));
        }
        info!(instance_name, "evolution instance created");
        Ok(())
    }

    /// Fetch the pairing QR code, with bounded fallback reads while the
    /// bridge is still generating it: connect endpoint, then
    /// fetchInstances, then connectionState.
    pub async fn connect_qr(&self, instance_name: &str) -> Result<QrCode> {
        tokio::time::sleep(self.timing.settle).await;

        let mut qr = QrCode::default();
        if let Ok(value) = self
            .get_json(&format!("/instance/connect/{instance_name}"), "connectQr")
            .await
        {
            qr = extract_qr(&value);
        }
        if !qr.is_empty() {
            debug!(instance_name, "qr code found in connect response");
            return Ok(normalize_qr(qr));
        }

        tokio::time::sleep(self.timing.retry_delay).await;
        if let Ok(value) = self
            .get_json(
                &format!("/instance/fetchInstances?instanceName={instance_name}"),
                "connectQr",
            )
            .await
        {
            let instance = match &value {
                serde_json::Value::Array(items) => items
                    .iter()
                    .find(|i| {
                        i.get("name").and_then(|n| n.as_str()) == Some(instance_name)
                            || i.get("instanceName").and_then(|n| n.as_str())
                                == Some(instance_name)
                    })
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
                other => other.clone(),
            };
            qr = extract_qr(&instance);
        }
        if !qr.is_empty() {
            return Ok(normalize_qr(qr));
        }

        tokio::time::sleep(self.timing.retry_delay).await;
        if let Ok(value) = self
            .get_json(
                &format!("/instance/connectionState/{instance_name}"),
                "connectQr",
            )
            .await
        {
            qr = extract_qr(&value);
        }

        if qr.is_empty() {
            warn!(instance_name, "qr code not available after bounded retries");
        }
        Ok(normalize_qr(qr))
    }

    /// Current connection state of an instance. A provider-side 404 is the
    /// `not_found` state, not an error.
    pub async fn connection_state(&self, instance_name: &str) -> Result<InstanceState> {
        let resp = self
            .http
            .get(format!(
                "{}/instance/connectionState/{instance_name}",
                self.base_url
            ))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "connectionState", e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(instance_name, "evolution instance not found");
            return Ok(InstanceState::NotFound);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                "connectionState",
                format!("HTTP {status}: {body}"),
            ));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, "connectionState", e))?;
        let state = value
            .get("state")
            .or_else(|| value.get("instance").and_then(|i| i.get("state")))
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");
        Ok(InstanceState::from_provider(state))
    }

    /// Delete an instance from the bridge.
    pub async fn delete_instance(&self, instance_name: &str) -> Result<()> {
        let resp = self
            .http
            .delete(format!("{}/instance/delete/{instance_name}", self.base_url))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "deleteInstance", e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                "deleteInstance",
                format!("HTTP {status}: {body}"),
            ));
        }
        Ok(())
    }

    /// Point the instance's webhook at `webhook_url`, subscribing message
    /// and connection events.
    pub async fn set_webhook(&self, instance_name: &str, webhook_url: &str) -> Result<()> {
        self.set_webhook_enabled(instance_name, webhook_url, true).await
    }

    async fn set_webhook_enabled(
        &self,
        instance_name: &str,
        webhook_url: &str,
        enabled: bool,
    ) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/webhook/set/{instance_name}", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "webhook": {
                    "enabled": enabled,
                    "url": webhook_url,
                    "webhookByEvents": false,
                    "webhookBase64": false,
                    "events": ["MESSAGES_UPSERT", "MESSAGES_UPDATE", "CONNECTION_UPDATE"],
                }
            }))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "setWebhook", e))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                "setWebhook",
                format!("HTTP {status}: {body}"),
            ));
        }
        Ok(())
    }
}

/// Pull a QR code and pairing code out of the bridge's loosely-shaped
/// responses: the fields move between `base64`, `qrcode.base64`, a bare
/// `qrcode` string, `qr`, and `code`/`pairingCode` depending on endpoint
/// and version.
fn extract_qr(value: &serde_json::Value) -> QrCode {
    let qrcode_field = value.get("qrcode");

    let qrcode = value
        .get("base64")
        .and_then(|v| v.as_str())
        .or_else(|| qrcode_field.and_then(|q| q.get("base64")).and_then(|v| v.as_str()))
        .or_else(|| qrcode_field.and_then(|v| v.as_str()))
        .or_else(|| qrcode_field.and_then(|q| q.get("code")).and_then(|v| v.as_str()))
        .or_else(|| value.get("qr").and_then(|v| v.as_str()))
        .map(str::to_string);

    let pairing_code = value
        .get("code")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("pairingCode").and_then(|v| v.as_str()))
        .or_else(|| {
            qrcode_field
                .and_then(|q| q.get("pairingCode"))
                .and_then(|v| v.as_str())
        })
        .map(str::to_string);

    QrCode { qrcode, pairing_code }
}

/// Strip any `data:...;base64,` prefix so only the raw base64 remains.
fn normalize_qr(mut qr: QrCode) -> QrCode {
    if let Some(code) = qr.qrcode.take() {
        qr.qrcode = Some(match code.rfind("base64,") {
            Some(idx) => code[idx + "base64,".len()..].to_string(),
            None => code,
        });
    }
    qr
}

#[async_trait]
impl ChannelAdapter for EvolutionAdapter {
    fn channel(&self) -> ChannelType {
        ChannelType::Evolution
    }

    /// For the bridge, "credentials" are the instance name; it is valid
    /// when the instance exists and is paired.
    async fn validate_credentials(&self, raw: &str) -> Result<ProviderIdentity> {
        match self.connection_state(raw).await? {
            InstanceState::Open => Ok(ProviderIdentity {
                account_id: raw.to_string(),
                display_name: None,
            }),
            state => Err(Error::provider(
                PROVIDER,
                "validateCredentials",
                format!("instance {raw} is not open (state: {state})"),
            )),
        }
    }

    async fn register_webhook(
        &self,
        connection: &ChannelConnection,
        callback_url: &str,
    ) -> Result<()> {
        let instance = Self::instance_name(connection)?;
        self.set_webhook_enabled(instance, callback_url, true).await
    }

    async fn send_message(
        &self,
        connection: &ChannelConnection,
        external_user_id: &str,
        text: &str,
    ) -> Result<SendReceipt> {
        connection.ensure_active()?;
        let instance = Self::instance_name(connection)?;

        let resp = self
            .http
            .post(format!("{}/message/sendText/{instance}", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "number": external_user_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, "sendMessage", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                PROVIDER,
                "sendMessage",
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: SendTextResponse = resp
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, "sendMessage", e))?;
        let message_id = parsed
            .key
            .and_then(|k| k.id)
            .unwrap_or_else(|| "unknown".to_string());
        info!(instance, to = external_user_id, message_id, "evolution outbound message sent");
        Ok(SendReceipt { message_id })
    }

    async fn deregister_webhook(&self, connection: &ChannelConnection) -> Result<()> {
        let instance = Self::instance_name(connection)?;
        self.set_webhook_enabled(instance, "", false).await
    }
}
