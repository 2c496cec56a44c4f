use {async_trait::async_trait, sqlx::SqlitePool};

use crate::error::{Error, Result};

/// Conversation lifecycle status.
///
/// unresolved → escalated (human takeover) → resolved (closed) →
/// unresolved again when a new inbound message reopens the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Unresolved,
    Escalated,
    Resolved,
}

impl ConversationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Unresolved => "unresolved",
            ConversationStatus::Escalated => "escalated",
            ConversationStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unresolved" => Ok(ConversationStatus::Unresolved),
            "escalated" => Ok(ConversationStatus::Escalated),
            "resolved" => Ok(ConversationStatus::Resolved),
            other => Err(Error::invalid_input(format!(
                "unknown conversation status: {other}"
            ))),
        }
    }
}

/// The support-ticket aggregate: one per contact session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Conversation {
    pub id: String,
    pub thread_id: String,
    pub organization_id: String,
    pub contact_session_id: String,
    pub status: ConversationStatus,
    /// Explicit agent override for this conversation, when set.
    pub agent_id: Option<String>,
}

/// Input for creating a conversation.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub thread_id: String,
    pub organization_id: String,
    pub contact_session_id: String,
}

/// Storage for conversations. One conversation per contact session,
/// enforced by a uniqueness index.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create the conversation for a contact session unless one already
    /// exists. Returns the conversation and whether this call created it.
    /// Creation is insert-if-absent against the uniqueness index, so
    /// concurrent first messages cannot produce two conversations.
    async fn create_if_absent(&self, conversation: NewConversation)
    -> Result<(Conversation, bool)>;

    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    async fn get_by_contact_session(
        &self,
        contact_session_id: &str,
    ) -> Result<Option<Conversation>>;

    /// Atomically transition resolved → unresolved. Returns whether the
    /// transition happened (false when the status was not `resolved`).
    async fn reopen_if_resolved(&self, id: &str) -> Result<bool>;

    /// Set the status, scoped to the owning organization.
    async fn set_status(
        &self,
        id: &str,
        organization_id: &str,
        status: ConversationStatus,
    ) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    thread_id: String,
    organization_id: String,
    contact_session_id: String,
    status: String,
    agent_id: Option<String>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = Error;

    fn try_from(r: ConversationRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            thread_id: r.thread_id,
            organization_id: r.organization_id,
            contact_session_id: r.contact_session_id,
            status: r.status.parse()?,
            agent_id: r.agent_id,
        })
    }
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the conversations table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversations (
                id                 TEXT PRIMARY KEY,
                thread_id          TEXT NOT NULL,
                organization_id    TEXT NOT NULL,
                contact_session_id TEXT NOT NULL UNIQUE,
                status             TEXT NOT NULL,
                agent_id           TEXT
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn create_if_absent(
        &self,
        conversation: NewConversation,
    ) -> Result<(Conversation, bool)> {
        let result = sqlx::query(
            r#"INSERT INTO conversations
                 (id, thread_id, organization_id, contact_session_id, status, agent_id)
               VALUES (?, ?, ?, ?, 'unresolved', NULL)
               ON CONFLICT(contact_session_id) DO NOTHING"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&conversation.thread_id)
        .bind(&conversation.organization_id)
        .bind(&conversation.contact_session_id)
        .execute(&self.pool)
        .await?;
        let created = result.rows_affected() == 1;

        let existing = self
            .get_by_contact_session(&conversation.contact_session_id)
            .await?
            .ok_or_else(|| Error::not_found("conversation"))?;
        Ok((existing, created))
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_contact_session(
        &self,
        contact_session_id: &str,
    ) -> Result<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT * FROM conversations WHERE contact_session_id = ?",
        )
        .bind(contact_session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn reopen_if_resolved(&self, id: &str) -> Result<bool> {
        // Guarded update: only flips the row when it is still resolved.
        let result = sqlx::query(
            "UPDATE conversations SET status = 'unresolved'
             WHERE id = ? AND status = 'resolved'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_status(
        &self,
        id: &str,
        organization_id: &str,
        status: ConversationStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE conversations SET status = ? WHERE id = ? AND organization_id = ?",
        )
        .bind(status.as_str())
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("conversation"));
        }
        Ok(())
    }
}
