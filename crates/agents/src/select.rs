use {
    crate::{
        error::Result,
        store::{AgentStore, AiAgent},
    },
    switchboard_channels::ChannelType,
};

/// Pick the agent that should answer on a channel.
///
/// Cascade: the channel's explicit assignment if it points at an active
/// agent, else the organization's active default, else none (no automated
/// reply is attempted).
pub async fn select_agent_for_channel(
    store: &dyn AgentStore,
    organization_id: &str,
    channel: ChannelType,
) -> Result<Option<AiAgent>> {
    if let Some(agent_id) = store.get_assignment(organization_id, channel).await?
        && let Some(agent) = store.get(organization_id, &agent_id).await?
        && agent.is_active
    {
        return Ok(Some(agent));
    }

    let default = store.get_default(organization_id).await?;
    Ok(default.filter(|agent| agent.is_active))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::store::{NewAgent, SqliteAgentStore},
        sqlx::SqlitePool,
    };

    async fn test_store() -> SqliteAgentStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteAgentStore::init(&pool).await.unwrap();
        SqliteAgentStore::new(pool)
    }

    fn agent(org: &str, name: &str, is_default: bool) -> NewAgent {
        NewAgent {
            organization_id: org.into(),
            name: name.into(),
            instructions: "Answer politely.".into(),
            is_default,
        }
    }

    #[tokio::test]
    async fn assignment_wins_over_default() {
        let store = test_store().await;
        let default = store.create(agent("org_1", "Default", true)).await.unwrap();
        let telegram = store.create(agent("org_1", "Telegram", false)).await.unwrap();
        store
            .assign_channel("org_1", ChannelType::Telegram, &telegram.id)
            .await
            .unwrap();

        let picked = select_agent_for_channel(&store, "org_1", ChannelType::Telegram)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, telegram.id);

        let picked = select_agent_for_channel(&store, "org_1", ChannelType::Whatsapp)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, default.id);
    }

    #[tokio::test]
    async fn inactive_assignment_falls_back_to_default() {
        let store = test_store().await;
        let default = store.create(agent("org_1", "Default", true)).await.unwrap();
        let telegram = store.create(agent("org_1", "Telegram", false)).await.unwrap();
        store
            .assign_channel("org_1", ChannelType::Telegram, &telegram.id)
            .await
            .unwrap();
        store.set_active("org_1", &telegram.id, false).await.unwrap();

        let picked = select_agent_for_channel(&store, "org_1", ChannelType::Telegram)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, default.id);
    }

    #[tokio::test]
    async fn no_active_agent_means_no_reply() {
        let store = test_store().await;
        let default = store.create(agent("org_1", "Default", true)).await.unwrap();
        store.set_active("org_1", &default.id, false).await.unwrap();

        let picked = select_agent_for_channel(&store, "org_1", ChannelType::Telegram)
            .await
            .unwrap();
        assert!(picked.is_none());
    }
}
