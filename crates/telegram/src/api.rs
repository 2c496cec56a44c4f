use {reqwest::Client, serde::Deserialize, tracing::debug};

use switchboard_channels::{Error, Result};

const PROVIDER: &str = "telegram";

/// Identity returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub can_join_groups: Option<bool>,
    #[serde(default)]
    pub can_read_all_group_messages: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
}

async fn parse_envelope<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    operation: &'static str,
) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::provider(PROVIDER, operation, e))?;

    let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|_| {
        Error::provider(PROVIDER, operation, format!("HTTP {status}: {body}"))
    })?;

    if !status.is_success() || !envelope.ok {
        let description = envelope.description.unwrap_or_else(|| body.clone());
        return Err(Error::provider(
            PROVIDER,
            operation,
            format!("HTTP {status}: {description}"),
        ));
    }
    envelope
        .result
        .ok_or_else(|| Error::provider(PROVIDER, operation, "empty result"))
}

/// Call `getMe` to validate a bot token and fetch the bot's identity.
pub async fn get_me(client: &Client, base_url: &str, bot_token: &str) -> Result<BotInfo> {
    debug!("validating telegram bot token");
    let resp = client
        .get(format!("{base_url}/bot{bot_token}/getMe"))
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "getMe", e))?;
    parse_envelope(resp, "getMe").await
}

/// Send a text message to a chat. HTML parse mode for basic formatting.
pub(crate) async fn send_message(
    client: &Client,
    base_url: &str,
    bot_token: &str,
    chat_id: i64,
    text: &str,
) -> Result<SentMessage> {
    let resp = client
        .post(format!("{base_url}/bot{bot_token}/sendMessage"))
        .json(&serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        }))
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "sendMessage", e))?;
    parse_envelope(resp, "sendMessage").await
}

/// Register the webhook callback URL, dropping any backlog of updates.
pub async fn set_webhook(
    client: &Client,
    base_url: &str,
    bot_token: &str,
    webhook_url: &str,
) -> Result<()> {
    let resp = client
        .post(format!("{base_url}/bot{bot_token}/setWebhook"))
        .json(&serde_json::json!({
            "url": webhook_url,
            "allowed_updates": ["message", "edited_message"],
            "drop_pending_updates": true,
        }))
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "setWebhook", e))?;
    let accepted: bool = parse_envelope(resp, "setWebhook").await?;
    if !accepted {
        return Err(Error::provider(PROVIDER, "setWebhook", "webhook not accepted"));
    }
    Ok(())
}

/// Remove the webhook registration.
pub async fn delete_webhook(client: &Client, base_url: &str, bot_token: &str) -> Result<()> {
    let resp = client
        .post(format!("{base_url}/bot{bot_token}/deleteWebhook"))
        .send()
        .await
        .map_err(|e| Error::provider(PROVIDER, "deleteWebhook", e))?;
    let _: bool = parse_envelope(resp, "deleteWebhook").await?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_me_parses_bot_identity() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/bot123:abc/getMe")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "ok": true,
                    "result": {
                        "id": 123,
                        "is_bot": true,
                        "first_name": "Support Bot",
                        "username": "acme_support_bot"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = Client::new();
        let info = get_me(&client, &server.url(), "123:abc").await.unwrap();
        assert!(info.is_bot);
        assert_eq!(info.username.as_deref(), Some("acme_support_bot"));
    }

    #[tokio::test]
    async fn get_me_surfaces_api_description() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/botbad/getMe")
            .with_status(401)
            .with_body(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let client = Client::new();
        let err = get_me(&client, &server.url(), "bad").await.unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn set_webhook_sends_allowed_updates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/setWebhook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "url": "https://app.example.com/webhooks/telegram?token=tok",
                "allowed_updates": ["message", "edited_message"],
                "drop_pending_updates": true
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":true}"#)
            .create_async()
            .await;

        let client = Client::new();
        set_webhook(
            &client,
            &server.url(),
            "123:abc",
            "https://app.example.com/webhooks/telegram?token=tok",
        )
        .await
        .unwrap();
        mock.assert_async().await;
    }
}
