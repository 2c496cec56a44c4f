use std::sync::Arc;

use {sqlx::SqlitePool, tracing::info};

use {
    switchboard_agents::{AgentStore, ReplyGenerator, SqliteAgentStore},
    switchboard_channels::{
        ChannelAdapter, ConnectionStore, SqliteConnectionStore, SqliteWebhookLog, WebhookLog,
    },
    switchboard_config::SwitchboardConfig,
    switchboard_evolution::EvolutionAdapter,
    switchboard_provider_setup::{EvolutionSetup, TelegramSetup, WhatsAppSetup},
    switchboard_routing::{
        InboundQueue, OutboundDispatcher, Router, RouterServices, SqliteSettingsStore, queue,
    },
    switchboard_sessions::{SqliteContactSessionStore, SqliteConversationStore, SqliteThreadLog},
    switchboard_telegram::TelegramAdapter,
    switchboard_whatsapp::WhatsAppAdapter,
};

/// Shared application state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SwitchboardConfig>,
    pub connections: Arc<dyn ConnectionStore>,
    pub webhook_log: Arc<dyn WebhookLog>,
    pub router: Arc<Router>,
    pub queue: InboundQueue,
    pub whatsapp_setup: Arc<WhatsAppSetup>,
    pub telegram_setup: Arc<TelegramSetup>,
    pub evolution_setup: Option<Arc<EvolutionSetup>>,
}

/// Wire every store, adapter, orchestrator, and the router into one app
/// state. Creates all tables on the given pool.
pub async fn build_app_state(
    config: SwitchboardConfig,
    pool: SqlitePool,
    reply: Arc<dyn ReplyGenerator>,
) -> anyhow::Result<AppState> {
    SqliteConnectionStore::init(&pool).await?;
    SqliteWebhookLog::init(&pool).await?;
    SqliteContactSessionStore::init(&pool).await?;
    SqliteConversationStore::init(&pool).await?;
    SqliteThreadLog::init(&pool).await?;
    SqliteAgentStore::init(&pool).await?;
    SqliteSettingsStore::init(&pool).await?;

    let connections: Arc<dyn ConnectionStore> =
        Arc::new(SqliteConnectionStore::new(pool.clone()));
    let webhook_log: Arc<dyn WebhookLog> = Arc::new(SqliteWebhookLog::new(pool.clone()));
    let contacts = Arc::new(SqliteContactSessionStore::new(pool.clone()));
    let conversations = Arc::new(SqliteConversationStore::new(pool.clone()));
    let threads = Arc::new(SqliteThreadLog::new(pool.clone()));
    let agents: Arc<dyn AgentStore> = Arc::new(SqliteAgentStore::new(pool.clone()));
    let settings = Arc::new(SqliteSettingsStore::new(pool));

    let whatsapp = Arc::new(WhatsAppAdapter::with_base_url(&config.meta.graph_base_url)?);
    let telegram = Arc::new(TelegramAdapter::with_base_url(&config.telegram.api_base_url)?);
    let evolution = if config.evolution.is_configured() {
        Some(Arc::new(EvolutionAdapter::new(
            &config.evolution.base_url,
            &config.evolution.api_key,
        )?))
    } else {
        info!("evolution bridge not configured, channel disabled");
        None
    };

    let outbound = OutboundDispatcher::new(
        Arc::clone(&whatsapp) as Arc<dyn ChannelAdapter>,
        Arc::clone(&telegram) as Arc<dyn ChannelAdapter>,
        evolution
            .as_ref()
            .map(|a| Arc::clone(a) as Arc<dyn ChannelAdapter>),
    );

    let router = Arc::new(Router::new(RouterServices {
        connections: Arc::clone(&connections),
        contacts,
        conversations,
        threads,
        agents,
        settings,
        reply,
        outbound,
        webhook_log: Arc::clone(&webhook_log),
    }));
    let queue = InboundQueue::start(
        Arc::clone(&router),
        queue::DEFAULT_CAPACITY,
        queue::DEFAULT_WORKERS,
    );

    let whatsapp_setup = Arc::new(WhatsAppSetup::new(
        Arc::clone(&connections),
        Arc::clone(&whatsapp),
        config.meta.clone(),
    ));
    let telegram_setup = Arc::new(TelegramSetup::new(
        Arc::clone(&connections),
        Arc::clone(&telegram),
        config.app.public_url.clone(),
    ));
    let evolution_setup = evolution.map(|adapter| {
        Arc::new(EvolutionSetup::new(
            Arc::clone(&connections),
            adapter,
            config.app.public_url.clone(),
        ))
    });

    Ok(AppState {
        config: Arc::new(config),
        connections,
        webhook_log,
        router,
        queue,
        whatsapp_setup,
        telegram_setup,
        evolution_setup,
    })
}
