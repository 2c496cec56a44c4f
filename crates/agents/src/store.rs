use {async_trait::async_trait, sqlx::SqlitePool};

use {
    crate::error::{Error, Result},
    switchboard_channels::ChannelType,
    switchboard_common::now_ms,
};

/// An automated agent configured by an organization.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AiAgent {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Full prompt handed to the reply generator.
    pub instructions: String,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating an agent.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub organization_id: String,
    pub name: String,
    pub instructions: String,
    pub is_default: bool,
}

/// Storage for agents and their per-channel assignments.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Create an agent. When `is_default` is set, any previous default of
    /// the organization loses the flag in the same transaction.
    async fn create(&self, agent: NewAgent) -> Result<AiAgent>;

    async fn get(&self, organization_id: &str, id: &str) -> Result<Option<AiAgent>>;

    /// The organization's default agent, if one is configured.
    async fn get_default(&self, organization_id: &str) -> Result<Option<AiAgent>>;

    async fn set_active(&self, organization_id: &str, id: &str, is_active: bool) -> Result<()>;

    /// Point a channel at a specific agent (replaces any previous
    /// assignment for that channel).
    async fn assign_channel(
        &self,
        organization_id: &str,
        channel: ChannelType,
        agent_id: &str,
    ) -> Result<()>;

    /// The agent assigned to a channel, if any.
    async fn get_assignment(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<String>>;
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    organization_id: String,
    name: String,
    instructions: String,
    is_active: bool,
    is_default: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<AgentRow> for AiAgent {
    fn from(r: AgentRow) -> Self {
        Self {
            id: r.id,
            organization_id: r.organization_id,
            name: r.name,
            instructions: r.instructions,
            is_active: r.is_active,
            is_default: r.is_default,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// SQLite-backed agent store.
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the agent tables if they do not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS ai_agents (
                id              TEXT    PRIMARY KEY,
                organization_id TEXT    NOT NULL,
                name            TEXT    NOT NULL,
                instructions    TEXT    NOT NULL,
                is_active       INTEGER NOT NULL,
                is_default      INTEGER NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_agent_assignments (
                organization_id TEXT    NOT NULL,
                channel         TEXT    NOT NULL,
                agent_id        TEXT    NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL,
                UNIQUE(organization_id, channel)
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn create(&self, agent: NewAgent) -> Result<AiAgent> {
        if agent.name.trim().is_empty() {
            return Err(Error::invalid_input("agent name must not be empty"));
        }
        let now = now_ms();
        let id = uuid::Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        if agent.is_default {
            // Only one default per organization.
            sqlx::query("UPDATE ai_agents SET is_default = 0, updated_at = ? WHERE organization_id = ? AND is_default = 1")
                .bind(now)
                .bind(&agent.organization_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            "INSERT INTO ai_agents
               (id, organization_id, name, instructions, is_active, is_default, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&agent.organization_id)
        .bind(&agent.name)
        .bind(&agent.instructions)
        .bind(agent.is_default)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(AiAgent {
            id,
            organization_id: agent.organization_id,
            name: agent.name,
            instructions: agent.instructions,
            is_active: true,
            is_default: agent.is_default,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, organization_id: &str, id: &str) -> Result<Option<AiAgent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            "SELECT * FROM ai_agents WHERE id = ? AND organization_id = ?",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_default(&self, organization_id: &str) -> Result<Option<AiAgent>> {
        let row = sqlx::query_as::<_, AgentRow>(
            "SELECT * FROM ai_agents WHERE organization_id = ? AND is_default = 1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn set_active(&self, organization_id: &str, id: &str, is_active: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE ai_agents SET is_active = ?, updated_at = ?
             WHERE id = ? AND organization_id = ?",
        )
        .bind(is_active)
        .bind(now_ms())
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn assign_channel(
        &self,
        organization_id: &str,
        channel: ChannelType,
        agent_id: &str,
    ) -> Result<()> {
        let agent = self.get(organization_id, agent_id).await?;
        if agent.is_none() {
            return Err(Error::NotFound);
        }
        let now = now_ms();
        sqlx::query(
            r#"INSERT INTO channel_agent_assignments
                 (organization_id, channel, agent_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(organization_id, channel) DO UPDATE SET
                 agent_id = excluded.agent_id,
                 updated_at = excluded.updated_at"#,
        )
        .bind(organization_id)
        .bind(channel.as_str())
        .bind(agent_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_assignment(
        &self,
        organization_id: &str,
        channel: ChannelType,
    ) -> Result<Option<String>> {
        let agent_id: Option<String> = sqlx::query_scalar(
            "SELECT agent_id FROM channel_agent_assignments
             WHERE organization_id = ? AND channel = ?",
        )
        .bind(organization_id)
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(agent_id)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteAgentStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteAgentStore::init(&pool).await.unwrap();
        SqliteAgentStore::new(pool)
    }

    fn support_agent(org: &str, name: &str, is_default: bool) -> NewAgent {
        NewAgent {
            organization_id: org.into(),
            name: name.into(),
            instructions: "You answer customer questions.".into(),
            is_default,
        }
    }

    #[tokio::test]
    async fn only_one_default_per_organization() {
        let store = test_store().await;
        let first = store.create(support_agent("org_1", "Support", true)).await.unwrap();
        let second = store.create(support_agent("org_1", "Sales", true)).await.unwrap();

        let default = store.get_default("org_1").await.unwrap().unwrap();
        assert_eq!(default.id, second.id);

        let old = store.get("org_1", &first.id).await.unwrap().unwrap();
        assert!(!old.is_default);
    }

    #[tokio::test]
    async fn assignment_replaces_previous() {
        let store = test_store().await;
        let a = store.create(support_agent("org_1", "A", false)).await.unwrap();
        let b = store.create(support_agent("org_1", "B", false)).await.unwrap();

        store.assign_channel("org_1", ChannelType::Telegram, &a.id).await.unwrap();
        store.assign_channel("org_1", ChannelType::Telegram, &b.id).await.unwrap();

        let assigned = store.get_assignment("org_1", ChannelType::Telegram).await.unwrap();
        assert_eq!(assigned.as_deref(), Some(b.id.as_str()));
    }

    #[tokio::test]
    async fn assignment_requires_an_owned_agent() {
        let store = test_store().await;
        let other = store.create(support_agent("org_2", "A", false)).await.unwrap();

        let err = store
            .assign_channel("org_1", ChannelType::Telegram, &other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn rejects_blank_name() {
        let store = test_store().await;
        let err = store.create(support_agent("org_1", "  ", false)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
