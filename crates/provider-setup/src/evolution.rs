use std::sync::Arc;

use tracing::{info, warn};

use {
    switchboard_channels::{
        ChannelType, ConnectionStatus, ConnectionStore, Credentials, Error as ChannelError,
        NewConnection,
    },
    switchboard_common::{OrgContext, now_ms, token::generate_webhook_token},
    switchboard_evolution::{EvolutionAdapter, InstanceState, adapter::METADATA_INSTANCE_NAME},
};

use crate::{error::Result, org_short_tag, webhook_url};

/// What the operator gets back from a connect call: the pairing material
/// to scan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvolutionConnectOutcome {
    pub organization_id: String,
    pub instance_name: String,
    pub qrcode: Option<String>,
    pub pairing_code: Option<String>,
}

/// Result of a status poll.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvolutionStatusReport {
    /// Provider-reported state string (`open`, `connecting`, `not_found`,
    /// `error`, ...).
    pub state: String,
    pub status: ConnectionStatus,
}

/// Evolution pairing orchestrator.
///
/// `connect` is idempotent against a live instance: while a pending or
/// connected instance exists provider-side it is reused, so re-invocation
/// (or two racing operators) cannot create a second instance.
pub struct EvolutionSetup {
    connections: Arc<dyn ConnectionStore>,
    adapter: Arc<EvolutionAdapter>,
    public_url: String,
}

impl EvolutionSetup {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        adapter: Arc<EvolutionAdapter>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            connections,
            adapter,
            public_url: public_url.into(),
        }
    }

    fn generate_instance_name(ctx: &OrgContext) -> String {
        let tag = org_short_tag(ctx);
        let suffix = now_ms() % 1_000_000;
        format!("org_{tag}_{suffix:06}")
    }

    /// Start (or resume) the pairing flow and return QR material.
    pub async fn connect(&self, ctx: &OrgContext) -> Result<EvolutionConnectOutcome> {
        let existing = self
            .connections
            .get_any(&ctx.organization_id, ChannelType::Evolution)
            .await?;

        if let Some(ref connection) = existing
            && matches!(
                connection.status,
                ConnectionStatus::Pending | ConnectionStatus::Connected
            )
        {
            let instance_name = connection.require_metadata(METADATA_INSTANCE_NAME)?.to_string();

            // Re-check provider-side existence before reusing.
            match self.adapter.connection_state(&instance_name).await? {
                InstanceState::NotFound => {
                    warn!(
                        instance_name,
                        "existing instance vanished provider-side, recreating"
                    );
                    self.mark_instance_lost(ctx, connection.clone()).await?;
                    // Fall through to fresh creation below.
                },
                _ => {
                    info!(instance_name, "reusing existing evolution instance");
                    let qr = self.adapter.connect_qr(&instance_name).await?;
                    return Ok(EvolutionConnectOutcome {
                        organization_id: ctx.organization_id.clone(),
                        instance_name,
                        qrcode: qr.qrcode,
                        pairing_code: qr.pairing_code,
                    });
                },
            }
        } else if let Some(ref connection) = existing
            && connection.status == ConnectionStatus::Disconnected
            && let Ok(old_instance) = connection.require_metadata(METADATA_INSTANCE_NAME)
        {
            // Best effort: the old instance may already be gone.
            if let Err(e) = self.adapter.delete_instance(old_instance).await {
                warn!(old_instance, error = %e, "failed to delete old instance");
            }
        }

        let instance_name = Self::generate_instance_name(ctx);
        info!(instance_name, "creating evolution instance");
        self.adapter.create_instance(&instance_name).await?;

        let webhook_token = generate_webhook_token();
        let callback = webhook_url(
            &self.public_url,
            "evolution",
            &format!("token={webhook_token}&instance={instance_name}"),
        );
        self.adapter.set_webhook(&instance_name, &callback).await?;

        self.connections
            .upsert(NewConnection {
                organization_id: ctx.organization_id.clone(),
                channel: ChannelType::Evolution,
                channel_account_id: instance_name.clone(),
                credentials: Credentials {
                    webhook_token: Some(webhook_token),
                    ..Credentials::default()
                },
                channel_metadata: serde_json::json!({
                    "instance_name": instance_name,
                    "connection_state": "pending",
                }),
                status: ConnectionStatus::Pending,
                error_message: None,
            })
            .await?;

        let qr = self.adapter.connect_qr(&instance_name).await?;
        Ok(EvolutionConnectOutcome {
            organization_id: ctx.organization_id.clone(),
            instance_name,
            qrcode: qr.qrcode,
            pairing_code: qr.pairing_code,
        })
    }

    /// One caller-driven status poll. Transport errors come back as an
    /// `error` report rather than a failure so UI polling loops keep
    /// running; `not_found` is terminal and flips the connection to
    /// disconnected.
    pub async fn check_status(
        &self,
        ctx: &OrgContext,
        instance_name: &str,
    ) -> Result<EvolutionStatusReport> {
        let Some(connection) = self
            .connections
            .get_any(&ctx.organization_id, ChannelType::Evolution)
            .await?
        else {
            // The connect flow may still be writing; report pending.
            return Ok(EvolutionStatusReport {
                state: "pending".into(),
                status: ConnectionStatus::Pending,
            });
        };

        let state = match self.adapter.connection_state(instance_name).await {
            Ok(state) => state,
            Err(e) => {
                warn!(instance_name, error = %e, "status poll failed");
                return Ok(EvolutionStatusReport {
                    state: "error".into(),
                    status: connection.status,
                });
            },
        };

        match state {
            InstanceState::NotFound => {
                self.mark_instance_lost(ctx, connection).await?;
                Ok(EvolutionStatusReport {
                    state: "not_found".into(),
                    status: ConnectionStatus::Disconnected,
                })
            },
            InstanceState::Open if connection.status != ConnectionStatus::Connected => {
                let status = self
                    .update_connection_status(ctx, instance_name, "open")
                    .await?;
                Ok(EvolutionStatusReport {
                    state: "open".into(),
                    status,
                })
            },
            state => Ok(EvolutionStatusReport {
                state: state.as_str().to_string(),
                status: connection.status,
            }),
        }
    }

    /// Apply a provider-reported state change (webhook `connection.update`
    /// or an observed poll result) to the stored connection.
    pub async fn update_connection_status(
        &self,
        ctx: &OrgContext,
        instance_name: &str,
        state: &str,
    ) -> Result<ConnectionStatus> {
        let Some(connection) = self
            .connections
            .get_any(&ctx.organization_id, ChannelType::Evolution)
            .await?
        else {
            warn!(instance_name, "connection update for unknown connection");
            return Err(ChannelError::not_found(ChannelType::Evolution).into());
        };
        if connection.channel_account_id != instance_name {
            return Err(ChannelError::invalid_input(format!(
                "instance mismatch: {instance_name} is not the current instance"
            ))
            .into());
        }

        let status = InstanceState::from_provider(state).connection_status();
        let mut metadata = connection.channel_metadata.clone();
        metadata["connection_state"] = serde_json::Value::String(state.to_string());
        metadata["last_update_at"] = serde_json::Value::from(now_ms());

        self.connections
            .upsert(NewConnection {
                organization_id: ctx.organization_id.clone(),
                channel: ChannelType::Evolution,
                channel_account_id: connection.channel_account_id,
                credentials: connection.credentials,
                channel_metadata: metadata,
                status,
                error_message: None,
            })
            .await?;
        info!(instance_name, state, %status, "evolution connection state updated");
        Ok(status)
    }

    /// Delete the instance provider-side and mark the connection
    /// disconnected.
    pub async fn disconnect(&self, ctx: &OrgContext) -> Result<()> {
        let connection = self
            .connections
            .get_active(&ctx.organization_id, ChannelType::Evolution)
            .await?
            .ok_or_else(|| ChannelError::not_found(ChannelType::Evolution))?;

        if let Ok(instance_name) = connection.require_metadata(METADATA_INSTANCE_NAME) {
            self.adapter.delete_instance(instance_name).await?;
        }
        self.connections
            .disconnect(&ctx.organization_id, ChannelType::Evolution)
            .await?;
        Ok(())
    }

    async fn mark_instance_lost(
        &self,
        ctx: &OrgContext,
        connection: switchboard_channels::ChannelConnection,
    ) -> Result<()> {
        let mut metadata = connection.channel_metadata.clone();
        metadata["error"] =
            serde_json::Value::String("instance not found on the Evolution bridge".into());
        self.connections
            .upsert(NewConnection {
                organization_id: ctx.organization_id.clone(),
                channel: ChannelType::Evolution,
                channel_account_id: connection.channel_account_id,
                credentials: connection.credentials,
                channel_metadata: metadata,
                status: ConnectionStatus::Disconnected,
                error_message: Some("instance not found on the Evolution bridge".into()),
            })
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
        std::time::Duration,
        switchboard_channels::SqliteConnectionStore,
        switchboard_evolution::QrTiming,
    };

    async fn store() -> Arc<SqliteConnectionStore> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteConnectionStore::init(&pool).await.unwrap();
        Arc::new(SqliteConnectionStore::new(pool))
    }

    fn adapter(base: &str) -> Arc<EvolutionAdapter> {
        let timing = QrTiming {
            settle: Duration::ZERO,
            retry_delay: Duration::ZERO,
        };
        Arc::new(EvolutionAdapter::with_timing(base, "key1", timing).unwrap())
    }

    fn qr_body() -> &'static str {
        r#"{"base64":"UVJD","code":"1234"}"#
    }

    #[tokio::test]
    async fn connect_creates_instance_and_pending_connection() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/instance/create")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let _webhook = server
            .mock("POST", mockito::Matcher::Regex("^/webhook/set/org_".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _qr = server
            .mock("GET", mockito::Matcher::Regex("^/instance/connect/org_".into()))
            .with_status(200)
            .with_body(qr_body())
            .create_async()
            .await;

        let connections = store().await;
        let setup = EvolutionSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            adapter(&server.url()),
            "https://app.example.com",
        );

        let outcome = setup.connect(&OrgContext::new("org_42")).await.unwrap();
        assert!(outcome.instance_name.starts_with("org_42_"));
        assert_eq!(outcome.qrcode.as_deref(), Some("UVJD"));
        create.assert_async().await;

        let connection = connections
            .get_any("org_42", ChannelType::Evolution)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connection.status, ConnectionStatus::Pending);
        assert_eq!(
            connection.metadata_str(METADATA_INSTANCE_NAME),
            Some(outcome.instance_name.as_str())
        );
    }

    #[tokio::test]
    async fn second_connect_reuses_the_pending_instance() {
        let mut server = mockito::Server::new_async().await;
        // Only ONE create may ever happen.
        let create = server
            .mock("POST", "/instance/create")
            .with_status(201)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let _webhook = server
            .mock("POST", mockito::Matcher::Regex("^/webhook/set/org_".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _qr = server
            .mock("GET", mockito::Matcher::Regex("^/instance/connect/org_".into()))
            .with_status(200)
            .with_body(qr_body())
            .expect_at_least(2)
            .create_async()
            .await;
        let _state = server
            .mock(
                "GET",
                mockito::Matcher::Regex("^/instance/connectionState/org_".into()),
            )
            .with_status(200)
            .with_body(r#"{"instance":{"state":"connecting"}}"#)
            .create_async()
            .await;

        let connections = store().await;
        let setup = EvolutionSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            adapter(&server.url()),
            "https://app.example.com",
        );

        let first = setup.connect(&OrgContext::new("org_42")).await.unwrap();
        let second = setup.connect(&OrgContext::new("org_42")).await.unwrap();

        assert_eq!(first.instance_name, second.instance_name);
        create.assert_async().await;

        let connection = connections
            .get_any("org_42", ChannelType::Evolution)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            connection.metadata_str(METADATA_INSTANCE_NAME),
            Some(first.instance_name.as_str())
        );
    }

    #[tokio::test]
    async fn vanished_instance_is_torn_down_and_recreated() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/instance/create")
            .with_status(201)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;
        let _webhook = server
            .mock("POST", mockito::Matcher::Regex("^/webhook/set/org_".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _qr = server
            .mock("GET", mockito::Matcher::Regex("^/instance/connect/org_".into()))
            .with_status(200)
            .with_body(qr_body())
            .create_async()
            .await;
        // The first instance no longer exists provider-side.
        let _state = server
            .mock(
                "GET",
                mockito::Matcher::Regex("^/instance/connectionState/org_".into()),
            )
            .with_status(404)
            .with_body(r#"{"status":404,"error":"Not Found"}"#)
            .create_async()
            .await;

        let connections = store().await;
        let setup = EvolutionSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            adapter(&server.url()),
            "https://app.example.com",
        );

        let first = setup.connect(&OrgContext::new("org_42")).await.unwrap();
        let second = setup.connect(&OrgContext::new("org_42")).await.unwrap();

        assert_ne!(first.instance_name, second.instance_name);
        create.assert_async().await;
    }

    #[tokio::test]
    async fn status_poll_marks_open_instances_connected() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/instance/create")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let _webhook = server
            .mock("POST", mockito::Matcher::Regex("^/webhook/set/org_".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _qr = server
            .mock("GET", mockito::Matcher::Regex("^/instance/connect/org_".into()))
            .with_status(200)
            .with_body(qr_body())
            .create_async()
            .await;
        let _state = server
            .mock(
                "GET",
                mockito::Matcher::Regex("^/instance/connectionState/org_".into()),
            )
            .with_status(200)
            .with_body(r#"{"instance":{"state":"open"}}"#)
            .create_async()
            .await;

        let connections = store().await;
        let setup = EvolutionSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            adapter(&server.url()),
            "https://app.example.com",
        );

        let outcome = setup.connect(&OrgContext::new("org_42")).await.unwrap();
        let report = setup
            .check_status(&OrgContext::new("org_42"), &outcome.instance_name)
            .await
            .unwrap();

        assert_eq!(report.state, "open");
        assert_eq!(report.status, ConnectionStatus::Connected);

        let connection = connections
            .get_active("org_42", ChannelType::Evolution)
            .await
            .unwrap();
        assert!(connection.is_some());
    }

    #[tokio::test]
    async fn status_poll_survives_transport_errors() {
        let connections = store().await;
        connections
            .upsert(NewConnection {
                organization_id: "org_42".into(),
                channel: ChannelType::Evolution,
                channel_account_id: "org_42_000001".into(),
                credentials: Credentials::default(),
                channel_metadata: serde_json::json!({"instance_name": "org_42_000001"}),
                status: ConnectionStatus::Pending,
                error_message: None,
            })
            .await
            .unwrap();

        // Nothing is listening on this port.
        let setup = EvolutionSetup::new(
            Arc::clone(&connections) as Arc<dyn ConnectionStore>,
            adapter("http://127.0.0.1:1"),
            "https://app.example.com",
        );

        let report = setup
            .check_status(&OrgContext::new("org_42"), "org_42_000001")
            .await
            .unwrap();
        assert_eq!(report.state, "error");
        assert_eq!(report.status, ConnectionStatus::Pending);
    }
}
