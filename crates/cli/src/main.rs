use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    sqlx::SqlitePool,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    switchboard_agents::{AgentStore, EchoReplyGenerator, NewAgent, SqliteAgentStore},
    switchboard_channels::ChannelType,
    switchboard_config::SwitchboardConfig,
    switchboard_gateway::{build_app_state, start},
};

#[derive(Parser)]
#[command(name = "switchboard", about = "switchboard — multi-channel support gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Path to switchboard.toml (overrides discovery).
    #[arg(long, global = true, env = "SWITCHBOARD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
    /// Agent management.
    Agents {
        #[command(subcommand)]
        action: AgentAction,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Create an agent for an organization.
    Create {
        #[arg(long)]
        organization_id: String,
        #[arg(long)]
        name: String,
        /// Full prompt for the agent.
        #[arg(long)]
        instructions: String,
        /// Make this the organization's default agent.
        #[arg(long, default_value_t = false)]
        default: bool,
    },
    /// Assign an agent to a channel.
    Assign {
        #[arg(long)]
        organization_id: String,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        agent_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    let config = switchboard_config::discover_and_load(cli.config.as_deref());

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli, config).await,
        Some(Commands::Agents { action }) => agents(action, config).await,
    }
}

async fn serve(cli: &Cli, config: SwitchboardConfig) -> anyhow::Result<()> {
    let bind = cli.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let port = cli.port.unwrap_or(config.server.port);

    let pool = open_database(&config).await?;
    let state = build_app_state(config, pool, Arc::new(EchoReplyGenerator)).await?;
    start(&bind, port, state).await
}

async fn agents(action: AgentAction, config: SwitchboardConfig) -> anyhow::Result<()> {
    let pool = open_database(&config).await?;
    SqliteAgentStore::init(&pool).await?;
    let store = SqliteAgentStore::new(pool);

    match action {
        AgentAction::Create {
            organization_id,
            name,
            instructions,
            default,
        } => {
            let agent = store
                .create(NewAgent {
                    organization_id,
                    name,
                    instructions,
                    is_default: default,
                })
                .await?;
            info!(agent_id = %agent.id, "agent created");
            println!("{}", agent.id);
        },
        AgentAction::Assign {
            organization_id,
            channel,
            agent_id,
        } => {
            let channel: ChannelType = channel.parse()?;
            store.assign_channel(&organization_id, channel, &agent_id).await?;
            println!("assigned {agent_id} to {channel}");
        },
    }
    Ok(())
}

async fn open_database(config: &SwitchboardConfig) -> anyhow::Result<SqlitePool> {
    let url = format!("sqlite:{}?mode=rwc", config.database.path);
    Ok(SqlitePool::connect(&url).await?)
}
