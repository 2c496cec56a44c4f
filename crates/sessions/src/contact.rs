use {async_trait::async_trait, sqlx::SqlitePool};

use {
    crate::error::{Error, Result},
    switchboard_channels::ChannelType,
    switchboard_common::now_ms,
};

/// How long a contact session stays fresh after its last inbound touch.
pub const SESSION_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

/// The platform's identity record for one external end user on one channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContactSession {
    pub id: String,
    pub organization_id: String,
    pub channel: ChannelType,
    pub channel_user_id: String,
    pub name: String,
    pub email: String,
    pub metadata: Option<serde_json::Value>,
    pub expires_at: i64,
    pub profile_picture_url: Option<String>,
}

/// Input for creating (or refreshing) a contact session.
#[derive(Debug, Clone)]
pub struct NewContactSession {
    pub organization_id: String,
    pub channel: ChannelType,
    pub channel_user_id: String,
    /// Display name; falls back to the channel user id when absent.
    pub name: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl NewContactSession {
    /// Synthesized address for channel users who have no email.
    #[must_use]
    pub fn synthesized_email(&self) -> String {
        format!("{}_{}@local", self.channel, self.channel_user_id)
    }
}

/// Storage for contact sessions, keyed by (channel, channel_user_id,
/// organization_id).
#[async_trait]
pub trait ContactSessionStore: Send + Sync {
    /// Resolve the session for the given identity, creating it when it
    /// does not exist yet. Concurrent calls for the same identity all
    /// resolve to the same row: creation is one atomic statement against
    /// the uniqueness index, never lookup-then-insert.
    async fn resolve_or_create(&self, session: NewContactSession) -> Result<ContactSession>;

    async fn get(&self, id: &str) -> Result<Option<ContactSession>>;

    async fn get_by_identity(
        &self,
        channel: ChannelType,
        channel_user_id: &str,
        organization_id: &str,
    ) -> Result<Option<ContactSession>>;
}

#[derive(sqlx::FromRow)]
struct ContactSessionRow {
    id: String,
    organization_id: String,
    channel: String,
    channel_user_id: String,
    name: String,
    email: String,
    metadata: Option<String>,
    expires_at: i64,
    profile_picture_url: Option<String>,
}

impl TryFrom<ContactSessionRow> for ContactSession {
    type Error = Error;

    fn try_from(r: ContactSessionRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            organization_id: r.organization_id,
            channel: r.channel.parse().map_err(Error::invalid_input)?,
            channel_user_id: r.channel_user_id,
            name: r.name,
            email: r.email,
            metadata: r.metadata.as_deref().map(serde_json::from_str).transpose()?,
            expires_at: r.expires_at,
            profile_picture_url: r.profile_picture_url,
        })
    }
}

/// SQLite-backed contact session store.
pub struct SqliteContactSessionStore {
    pool: SqlitePool,
}

impl SqliteContactSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the contact sessions table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS contact_sessions (
                id                  TEXT    PRIMARY KEY,
                organization_id     TEXT    NOT NULL,
                channel             TEXT    NOT NULL,
                channel_user_id     TEXT    NOT NULL,
                name                TEXT    NOT NULL,
                email               TEXT    NOT NULL,
                metadata            TEXT,
                expires_at          INTEGER NOT NULL,
                profile_picture_url TEXT,
                UNIQUE(channel, channel_user_id, organization_id)
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ContactSessionStore for SqliteContactSessionStore {
    async fn resolve_or_create(&self, session: NewContactSession) -> Result<ContactSession> {
        let email = session.synthesized_email();
        let name = session
            .name
            .clone()
            .unwrap_or_else(|| session.channel_user_id.clone());
        let expires_at = now_ms() + SESSION_DURATION_MS;

        let row = sqlx::query_as::<_, ContactSessionRow>(
            r#"INSERT INTO contact_sessions
                 (id, organization_id, channel, channel_user_id, name, email,
                  metadata, expires_at, profile_picture_url)
               VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
               ON CONFLICT(channel, channel_user_id, organization_id) DO UPDATE SET
                 expires_at = excluded.expires_at
               RETURNING *"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&session.organization_id)
        .bind(session.channel.as_str())
        .bind(&session.channel_user_id)
        .bind(&name)
        .bind(&email)
        .bind(expires_at)
        .bind(&session.profile_picture_url)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: &str) -> Result<Option<ContactSession>> {
        let row = sqlx::query_as::<_, ContactSessionRow>(
            "SELECT * FROM contact_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_identity(
        &self,
        channel: ChannelType,
        channel_user_id: &str,
        organization_id: &str,
    ) -> Result<Option<ContactSession>> {
        let row = sqlx::query_as::<_, ContactSessionRow>(
            "SELECT * FROM contact_sessions
             WHERE channel = ? AND channel_user_id = ? AND organization_id = ?",
        )
        .bind(channel.as_str())
        .bind(channel_user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }
}
