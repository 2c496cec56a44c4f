use {async_trait::async_trait, sqlx::SqlitePool};

use crate::error::Result;

/// Greeting used when an organization has not configured one.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Per-organization conversation settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OrgSettings {
    pub organization_id: String,
    pub greet_message: String,
}

/// Storage for organization settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, organization_id: &str) -> Result<Option<OrgSettings>>;
    async fn upsert(&self, settings: OrgSettings) -> Result<()>;

    /// The greeting to seed new conversation threads with.
    async fn greeting(&self, organization_id: &str) -> Result<String> {
        Ok(self
            .get(organization_id)
            .await?
            .map(|s| s.greet_message)
            .unwrap_or_else(|| DEFAULT_GREETING.to_string()))
    }
}

/// SQLite-backed settings store.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the settings table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS org_settings (
                organization_id TEXT PRIMARY KEY,
                greet_message   TEXT NOT NULL
            )"#,
        )
        .execute(pool)
        .await
        .map_err(switchboard_channels::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, organization_id: &str) -> Result<Option<OrgSettings>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT organization_id, greet_message FROM org_settings WHERE organization_id = ?",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(switchboard_channels::Error::from)?;
        Ok(row.map(|(organization_id, greet_message)| OrgSettings {
            organization_id,
            greet_message,
        }))
    }

    async fn upsert(&self, settings: OrgSettings) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO org_settings (organization_id, greet_message)
               VALUES (?, ?)
               ON CONFLICT(organization_id) DO UPDATE SET
                 greet_message = excluded.greet_message"#,
        )
        .bind(&settings.organization_id)
        .bind(&settings.greet_message)
        .execute(&self.pool)
        .await
        .map_err(switchboard_channels::Error::from)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteSettingsStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteSettingsStore::init(&pool).await.unwrap();
        SqliteSettingsStore::new(pool)
    }

    #[tokio::test]
    async fn greeting_falls_back_to_default() {
        let store = test_store().await;
        assert_eq!(store.greeting("org_1").await.unwrap(), DEFAULT_GREETING);
    }

    #[tokio::test]
    async fn configured_greeting_wins() {
        let store = test_store().await;
        store
            .upsert(OrgSettings {
                organization_id: "org_1".into(),
                greet_message: "Welcome to Acme support!".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.greeting("org_1").await.unwrap(), "Welcome to Acme support!");
        assert_eq!(store.greeting("org_2").await.unwrap(), DEFAULT_GREETING);
    }
}
