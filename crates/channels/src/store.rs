use {async_trait::async_trait, sqlx::SqlitePool};

use {
    crate::{
        connection::{ChannelConnection, ConnectionStatus, NewConnection},
        error::{Error, Result},
        types::ChannelType,
    },
    switchboard_common::now_ms,
};

/// Keyed storage for channel connections.
///
/// Every accessor is scoped by organization (or by a token/account id that
/// resolves to exactly one organization); there is no cross-tenant read
/// path.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Create or update the single connection for (organization, channel).
    /// Returns the connection id.
    async fn upsert(&self, connection: NewConnection) -> Result<String>;

    /// The connection for (organization, channel), only if `connected`.
    async fn get_active(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<ChannelConnection>>;

    /// The connection for (organization, channel) in any status. Used by
    /// reconnection flows.
    async fn get_any(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<ChannelConnection>>;

    /// Resolve a connection from its per-connection webhook token.
    async fn get_by_webhook_token(
        &self,
        channel: ChannelType,
        token: &str,
    ) -> Result<Option<ChannelConnection>>;

    /// Resolve a connection from the provider-assigned account id (e.g.
    /// the WhatsApp phone_number_id).
    async fn get_by_account_id(
        &self,
        channel: ChannelType,
        channel_account_id: &str,
    ) -> Result<Option<ChannelConnection>>;

    /// All connections of an organization, newest sync first.
    async fn list(&self, organization_id: &str) -> Result<Vec<ChannelConnection>>;

    /// Mark the connection disconnected. Never deletes; the record stays
    /// for the audit trail.
    async fn disconnect(&self, organization_id: &str, channel: ChannelType) -> Result<()>;
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: String,
    organization_id: String,
    channel: String,
    channel_account_id: String,
    credentials: String,
    channel_metadata: String,
    status: String,
    connected_at: i64,
    last_sync_at: Option<i64>,
    error_message: Option<String>,
}

impl TryFrom<ConnectionRow> for ChannelConnection {
    type Error = Error;

    fn try_from(r: ConnectionRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            organization_id: r.organization_id,
            channel: r.channel.parse()?,
            channel_account_id: r.channel_account_id,
            credentials: serde_json::from_str(&r.credentials)?,
            channel_metadata: serde_json::from_str(&r.channel_metadata)?,
            status: r.status.parse()?,
            connected_at: r.connected_at,
            last_sync_at: r.last_sync_at,
            error_message: r.error_message,
        })
    }
}

/// SQLite-backed connection store.
pub struct SqliteConnectionStore {
    pool: SqlitePool,
}

impl SqliteConnectionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the connections table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_connections (
                id                 TEXT    PRIMARY KEY,
                organization_id    TEXT    NOT NULL,
                channel            TEXT    NOT NULL,
                channel_account_id TEXT    NOT NULL,
                credentials        TEXT    NOT NULL,
                channel_metadata   TEXT    NOT NULL,
                status             TEXT    NOT NULL,
                connected_at       INTEGER NOT NULL,
                last_sync_at       INTEGER,
                error_message      TEXT,
                UNIQUE(organization_id, channel)
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        binds: &[&str],
    ) -> Result<Option<ChannelConnection>> {
        let sql = format!("SELECT * FROM channel_connections WHERE {clause}");
        let mut query = sqlx::query_as::<_, ConnectionRow>(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    async fn upsert(&self, connection: NewConnection) -> Result<String> {
        let now = now_ms();
        let credentials = serde_json::to_string(&connection.credentials)?;
        let metadata = serde_json::to_string(&connection.channel_metadata)?;
        // The unique index on (organization_id, channel) makes this a
        // single atomic create-or-update; the original row id survives
        // updates.
        let id: String = sqlx::query_scalar(
            r#"INSERT INTO channel_connections
                 (id, organization_id, channel, channel_account_id, credentials,
                  channel_metadata, status, connected_at, last_sync_at, error_message)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(organization_id, channel) DO UPDATE SET
                 channel_account_id = excluded.channel_account_id,
                 credentials = excluded.credentials,
                 channel_metadata = excluded.channel_metadata,
                 status = excluded.status,
                 last_sync_at = excluded.last_sync_at,
                 error_message = excluded.error_message
               RETURNING id"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&connection.organization_id)
        .bind(connection.channel.as_str())
        .bind(&connection.channel_account_id)
        .bind(&credentials)
        .bind(&metadata)
        .bind(connection.status.as_str())
        .bind(now)
        .bind(now)
        .bind(&connection.error_message)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_active(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<ChannelConnection>> {
        let connection = self.get_any(organization_id, channel).await?;
        Ok(connection.filter(|c| c.status == ConnectionStatus::Connected))
    }

    async fn get_any(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<ChannelConnection>> {
        self.fetch_one_where(
            "organization_id = ? AND channel = ?",
            &[organization_id, channel.as_str()],
        )
        .await
    }

    async fn get_by_webhook_token(
        &self,
        channel: ChannelType,
        token: &str,
    ) -> Result<Option<ChannelConnection>> {
        self.fetch_one_where(
            "channel = ? AND json_extract(credentials, '$.webhook_token') = ?",
            &[channel.as_str(), token],
        )
        .await
    }

    async fn get_by_account_id(
        &self,
        channel: ChannelType,
        channel_account_id: &str,
    ) -> Result<Option<ChannelConnection>> {
        self.fetch_one_where(
            "channel = ? AND channel_account_id = ?",
            &[channel.as_str(), channel_account_id],
        )
        .await
    }

    async fn list(&self, organization_id: &str) -> Result<Vec<ChannelConnection>> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            "SELECT * FROM channel_connections WHERE organization_id = ?
             ORDER BY last_sync_at DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn disconnect(&self, organization_id: &str, channel: ChannelType) -> Result<()> {
        let result = sqlx::query(
            "UPDATE channel_connections SET status = 'disconnected', last_sync_at = ?
             WHERE organization_id = ? AND channel = ?",
        )
        .bind(now_ms())
        .bind(organization_id)
        .bind(channel.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(channel));
        }
        Ok(())
    }
}
