use {async_trait::async_trait, sqlx::SqlitePool};

use {
    crate::error::{Error, Result},
    switchboard_common::now_ms,
};

/// Who authored a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The external end user.
    User,
    /// An automated agent reply.
    Assistant,
    /// A human operator replying from the dashboard.
    Operator,
}

impl MessageRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Operator => "operator",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "operator" => Ok(MessageRole::Operator),
            other => Err(Error::invalid_input(format!("unknown message role: {other}"))),
        }
    }
}

/// One message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ThreadMessage {
    pub id: i64,
    pub thread_id: String,
    pub role: MessageRole,
    pub body: String,
    pub created_at: i64,
}

/// The ordered, append-only message log backing conversations.
#[async_trait]
pub trait ThreadLog: Send + Sync {
    /// Append one message; ordering is assigned by the log.
    async fn append(&self, thread_id: &str, role: MessageRole, body: &str) -> Result<()>;

    /// The last `n` messages of a thread, oldest first.
    async fn list_last(&self, thread_id: &str, n: u32) -> Result<Vec<ThreadMessage>>;
}

#[derive(sqlx::FromRow)]
struct ThreadMessageRow {
    id: i64,
    thread_id: String,
    role: String,
    body: String,
    created_at: i64,
}

impl TryFrom<ThreadMessageRow> for ThreadMessage {
    type Error = Error;

    fn try_from(r: ThreadMessageRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            thread_id: r.thread_id,
            role: r.role.parse()?,
            body: r.body,
            created_at: r.created_at,
        })
    }
}

/// SQLite-backed thread log.
pub struct SqliteThreadLog {
    pool: SqlitePool,
}

impl SqliteThreadLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the thread messages table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS thread_messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id  TEXT    NOT NULL,
                role       TEXT    NOT NULL,
                body       TEXT    NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_thread_messages_thread
             ON thread_messages (thread_id, id)",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ThreadLog for SqliteThreadLog {
    async fn append(&self, thread_id: &str, role: MessageRole, body: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO thread_messages (thread_id, role, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(role.as_str())
        .bind(body)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_last(&self, thread_id: &str, n: u32) -> Result<Vec<ThreadMessage>> {
        let rows = sqlx::query_as::<_, ThreadMessageRow>(
            "SELECT * FROM (
               SELECT * FROM thread_messages WHERE thread_id = ? ORDER BY id DESC LIMIT ?
             ) ORDER BY id ASC",
        )
        .bind(thread_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_log() -> SqliteThreadLog {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteThreadLog::init(&pool).await.unwrap();
        SqliteThreadLog::new(pool)
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let log = test_log().await;
        log.append("t1", MessageRole::Assistant, "hello, how can I help?").await.unwrap();
        log.append("t1", MessageRole::User, "my order is late").await.unwrap();
        log.append("t1", MessageRole::Assistant, "let me check").await.unwrap();

        let messages = log.list_last("t1", 10).await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec!["hello, how can I help?", "my order is late", "let me check"]
        );
    }

    #[tokio::test]
    async fn list_last_returns_the_tail() {
        let log = test_log().await;
        for i in 0..5 {
            log.append("t1", MessageRole::User, &format!("m{i}")).await.unwrap();
        }

        let messages = log.list_last("t1", 2).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "m3");
        assert_eq!(messages[1].body, "m4");
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let log = test_log().await;
        log.append("t1", MessageRole::User, "one").await.unwrap();
        log.append("t2", MessageRole::User, "two").await.unwrap();

        assert_eq!(log.list_last("t1", 10).await.unwrap().len(), 1);
        assert_eq!(log.list_last("t2", 10).await.unwrap().len(), 1);
    }
}
