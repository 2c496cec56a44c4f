use {async_trait::async_trait, sqlx::SqlitePool};

use {
    crate::{error::Result, types::ChannelType},
    switchboard_common::now_ms,
};

/// A recorded webhook processing attempt. Rows are never mutated after
/// insert; the log exists for diagnostics only.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookLogEntry {
    pub id: i64,
    pub organization_id: String,
    pub channel: ChannelType,
    /// "message", "status", "connection_update", ...
    pub event_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub payload: serde_json::Value,
    pub processed_at: i64,
}

/// Input for a new log row.
#[derive(Debug, Clone)]
pub struct NewWebhookLogEntry {
    pub organization_id: String,
    pub channel: ChannelType,
    pub event_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub payload: serde_json::Value,
}

impl NewWebhookLogEntry {
    #[must_use]
    pub fn success(
        organization_id: impl Into<String>,
        channel: ChannelType,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            channel,
            event_type: event_type.into(),
            success: true,
            error: None,
            payload,
        }
    }

    #[must_use]
    pub fn failure(
        organization_id: impl Into<String>,
        channel: ChannelType,
        event_type: impl Into<String>,
        error: impl std::fmt::Display,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            channel,
            event_type: event_type.into(),
            success: false,
            error: Some(error.to_string()),
            payload,
        }
    }
}

/// Append-only audit log of webhook processing outcomes.
#[async_trait]
pub trait WebhookLog: Send + Sync {
    async fn record(&self, entry: NewWebhookLogEntry) -> Result<()>;
    async fn list_recent(&self, organization_id: &str, limit: u32) -> Result<Vec<WebhookLogEntry>>;
}

#[derive(sqlx::FromRow)]
struct WebhookLogRow {
    id: i64,
    organization_id: String,
    channel: String,
    event_type: String,
    success: bool,
    error: Option<String>,
    payload: String,
    processed_at: i64,
}

/// SQLite-backed webhook log.
pub struct SqliteWebhookLog {
    pool: SqlitePool,
}

impl SqliteWebhookLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the log table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS webhook_logs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id TEXT    NOT NULL,
                channel         TEXT    NOT NULL,
                event_type      TEXT    NOT NULL,
                success         INTEGER NOT NULL,
                error           TEXT,
                payload         TEXT    NOT NULL,
                processed_at    INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WebhookLog for SqliteWebhookLog {
    async fn record(&self, entry: NewWebhookLogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO webhook_logs
               (organization_id, channel, event_type, success, error, payload, processed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.organization_id)
        .bind(entry.channel.as_str())
        .bind(&entry.event_type)
        .bind(entry.success)
        .bind(&entry.error)
        .bind(serde_json::to_string(&entry.payload)?)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recent(&self, organization_id: &str, limit: u32) -> Result<Vec<WebhookLogEntry>> {
        let rows = sqlx::query_as::<_, WebhookLogRow>(
            "SELECT * FROM webhook_logs WHERE organization_id = ?
             ORDER BY id DESC LIMIT ?",
        )
        .bind(organization_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(WebhookLogEntry {
                    id: r.id,
                    organization_id: r.organization_id,
                    channel: r.channel.parse()?,
                    event_type: r.event_type,
                    success: r.success,
                    error: r.error,
                    payload: serde_json::from_str(&r.payload)?,
                    processed_at: r.processed_at,
                })
            })
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_log() -> SqliteWebhookLog {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteWebhookLog::init(&pool).await.unwrap();
        SqliteWebhookLog::new(pool)
    }

    #[tokio::test]
    async fn records_success_and_failure() {
        let log = test_log().await;

        log.record(NewWebhookLogEntry::success(
            "org_1",
            ChannelType::Telegram,
            "message",
            serde_json::json!({"chat_id": "555"}),
        ))
        .await
        .unwrap();
        log.record(NewWebhookLogEntry::failure(
            "org_1",
            ChannelType::Telegram,
            "message",
            "send failed",
            serde_json::json!({}),
        ))
        .await
        .unwrap();

        let entries = log.list_recent("org_1", 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert!(!entries[0].success);
        assert_eq!(entries[0].error.as_deref(), Some("send failed"));
        assert!(entries[1].success);
        assert_eq!(entries[1].payload["chat_id"], "555");
    }

    #[tokio::test]
    async fn list_is_tenant_scoped() {
        let log = test_log().await;
        log.record(NewWebhookLogEntry::success(
            "org_1",
            ChannelType::Whatsapp,
            "message",
            serde_json::json!({}),
        ))
        .await
        .unwrap();

        assert!(log.list_recent("org_2", 10).await.unwrap().is_empty());
    }
}
