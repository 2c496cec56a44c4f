use std::sync::Arc;

use {tracing::info, url::Url};

use {
    switchboard_channels::{
        ChannelType, ConnectionStatus, ConnectionStore, Credentials, NewConnection,
    },
    switchboard_common::{OrgContext, now_ms, token::generate_webhook_token},
    switchboard_config::MetaConfig,
    switchboard_whatsapp::{WhatsAppAdapter, api},
};

use crate::error::{Error, Result};

const OAUTH_SCOPES: &str = "whatsapp_business_messaging,whatsapp_business_account_management";

/// Result of a completed OAuth callback.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WhatsAppCallbackOutcome {
    pub organization_id: String,
    pub phone_number: String,
    pub verified_name: Option<String>,
}

/// Meta OAuth orchestrator: builds the authorization URL and turns the
/// redirect callback into a connected WhatsApp account.
pub struct WhatsAppSetup {
    connections: Arc<dyn ConnectionStore>,
    adapter: Arc<WhatsAppAdapter>,
    meta: MetaConfig,
}

impl WhatsAppSetup {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        adapter: Arc<WhatsAppAdapter>,
        meta: MetaConfig,
    ) -> Self {
        Self {
            connections,
            adapter,
            meta,
        }
    }

    /// The Meta OAuth dialog URL for an organization. `state` carries the
    /// organization id through the round trip.
    pub fn authorize_url(&self, ctx: &OrgContext) -> Result<String> {
        if self.meta.app_id.is_empty() {
            return Err(Error::not_configured("whatsapp", "meta.app_id"));
        }
        if self.meta.redirect_uri.is_empty() {
            return Err(Error::not_configured("whatsapp", "meta.redirect_uri"));
        }

        let mut url = Url::parse(&self.meta.oauth_dialog_url)
            .map_err(|e| Error::unusable(format!("invalid oauth dialog URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.meta.app_id)
            .append_pair("redirect_uri", &self.meta.redirect_uri)
            .append_pair("scope", OAUTH_SCOPES)
            .append_pair("state", &ctx.organization_id);
        Ok(url.into())
    }

    /// Complete the OAuth flow: exchange the code, discover the business
    /// account and phone number, and persist the connection as connected.
    /// Any failing step leaves the store untouched.
    pub async fn handle_callback(
        &self,
        ctx: &OrgContext,
        code: &str,
    ) -> Result<WhatsAppCallbackOutcome> {
        if self.meta.app_secret.is_empty() {
            return Err(Error::not_configured("whatsapp", "meta.app_secret"));
        }

        let http = self.adapter.http();
        let base = self.adapter.base_url();

        let token = api::exchange_code(
            http,
            base,
            &self.meta.app_id,
            &self.meta.app_secret,
            &self.meta.redirect_uri,
            code,
        )
        .await?;

        let accounts = api::fetch_business_accounts(http, base, &token.access_token).await?;
        let account = accounts
            .first()
            .ok_or_else(|| Error::unusable("no WhatsApp Business Accounts found"))?;

        let phones = api::fetch_phone_numbers(http, base, &token.access_token, &account.id).await?;
        let phone = phones
            .first()
            .ok_or_else(|| Error::unusable("no phone numbers found in WhatsApp Business Account"))?;

        let user = api::fetch_me(http, base, &token.access_token).await?;
        let webhook_token = generate_webhook_token();

        self.connections
            .upsert(NewConnection {
                organization_id: ctx.organization_id.clone(),
                channel: ChannelType::Whatsapp,
                channel_account_id: phone.id.clone(),
                credentials: Credentials {
                    access_token: Some(token.access_token),
                    webhook_token: Some(webhook_token),
                    expires_at: token.expires_in.map(|secs| now_ms() + secs * 1000),
                    ..Credentials::default()
                },
                channel_metadata: serde_json::json!({
                    "waba_id": account.id,
                    "phone_number": phone.display_phone_number,
                    "verified_name": phone.verified_name,
                    "meta_user_id": user.id,
                }),
                status: ConnectionStatus::Connected,
                error_message: None,
            })
            .await?;

        info!(
            organization_id = %ctx.organization_id,
            phone_number = %phone.display_phone_number,
            "whatsapp connected"
        );
        Ok(WhatsAppCallbackOutcome {
            organization_id: ctx.organization_id.clone(),
            phone_number: phone.display_phone_number.clone(),
            verified_name: phone.verified_name.clone(),
        })
    }

    /// Mark the account disconnected. The record is kept for audit.
    pub async fn disconnect(&self, ctx: &OrgContext) -> Result<()> {
        self.connections
            .disconnect(&ctx.organization_id, ChannelType::Whatsapp)
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        sqlx::SqlitePool,
        switchboard_channels::SqliteConnectionStore,
    };

    async fn store() -> Arc<SqliteConnectionStore> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteConnectionStore::init(&pool).await.unwrap();
        Arc::new(SqliteConnectionStore::new(pool))
    }

    fn meta_config(base: &str) -> MetaConfig {
        MetaConfig {
            app_id: "app1".into(),
            app_secret: "secret1".into(),
            redirect_uri: "https://app.example.com/webhooks/whatsapp/callback".into(),
            verify_token: "static-verify".into(),
            graph_base_url: base.into(),
            ..MetaConfig::default()
        }
    }

    #[tokio::test]
    async fn authorize_url_carries_org_as_state() {
        let setup = WhatsAppSetup::new(
            store().await,
            Arc::new(WhatsAppAdapter::new().unwrap()),
            meta_config("https://graph.facebook.com/v18.0"),
        );

        let url = setup.authorize_url(&OrgContext::new("org_42")).unwrap();
        assert!(url.contains("client_id=app1"));
        assert!(url.contains("state=org_42"));
        assert!(url.contains("whatsapp_business_messaging"));
    }

    #[tokio::test]
    async fn authorize_url_requires_configuration() {
        let setup = WhatsAppSetup::new(
            store().await,
            Arc::new(WhatsAppAdapter::new().unwrap()),
            MetaConfig::default(),
        );
        let err = setup.authorize_url(&OrgContext::new("org_42")).unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn callback_persists_a_connected_account() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/access_token")
            .with_status(200)
            .with_body(r#"{"access_token":"EAAnew","token_type":"bearer","expires_in":3600}"#)
            .create_async()
            .await;
        let _accounts = server
            .mock("GET", "/me/owned_whatsapp_business_accounts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":[{"id":"waba_9","name":"Acme"}]}"#)
            .create_async()
            .await;
        let _phones = server
            .mock("GET", "/waba_9/phone_numbers")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data":[{"id":"pn_1","display_phone_number":"+55 11 99999-9999","verified_name":"Acme"}]}"#,
            )
            .create_async()
            .await;
        let _me = server
            .mock("GET", "/me")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"meta_user_7","name":"Acme Admin"}"#)
            .create_async()
            .await;

        let connections = store().await;
        let setup = WhatsAppSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            Arc::new(WhatsAppAdapter::with_base_url(server.url()).unwrap()),
            meta_config(&server.url()),
        );

        let outcome = setup
            .handle_callback(&OrgContext::new("org_42"), "authcode")
            .await
            .unwrap();
        assert_eq!(outcome.phone_number, "+55 11 99999-9999");

        let connection = connections
            .get_active("org_42", ChannelType::Whatsapp)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connection.channel_account_id, "pn_1");
        assert_eq!(connection.credentials.access_token.as_deref(), Some("EAAnew"));
        assert!(connection.credentials.webhook_token.is_some());
        assert_eq!(connection.metadata_str("waba_id"), Some("waba_9"));
    }

    #[tokio::test]
    async fn failed_exchange_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/access_token")
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad code"}}"#)
            .create_async()
            .await;

        let connections = store().await;
        let setup = WhatsAppSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            Arc::new(WhatsAppAdapter::with_base_url(server.url()).unwrap()),
            meta_config(&server.url()),
        );

        assert!(setup
            .handle_callback(&OrgContext::new("org_42"), "bad")
            .await
            .is_err());
        assert!(connections
            .get_any("org_42", ChannelType::Whatsapp)
            .await
            .unwrap()
            .is_none());
    }
}
