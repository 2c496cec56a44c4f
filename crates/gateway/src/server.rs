use {
    axum::{
        Router,
        routing::{get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{
    channel_routes, evolution_routes,
    state::AppState,
    telegram_routes, whatsapp_routes,
};

/// Build the gateway router (shared between production startup and tests).
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Provider webhooks.
        .route(
            "/webhooks/whatsapp",
            get(whatsapp_routes::verify_handler).post(whatsapp_routes::webhook_handler),
        )
        .route(
            "/webhooks/whatsapp/callback",
            get(whatsapp_routes::oauth_callback_handler),
        )
        .route("/webhooks/telegram", post(telegram_routes::webhook_handler))
        .route("/webhooks/evolution", post(evolution_routes::webhook_handler))
        // Operator API.
        .route("/api/channels", get(channel_routes::list_channels_handler))
        .route(
            "/api/channels/whatsapp/authorize-url",
            get(channel_routes::whatsapp_authorize_url_handler),
        )
        .route(
            "/api/channels/telegram/connect",
            post(channel_routes::telegram_connect_handler),
        )
        .route(
            "/api/channels/evolution/connect",
            post(channel_routes::evolution_connect_handler),
        )
        .route(
            "/api/channels/evolution/status",
            get(channel_routes::evolution_status_handler),
        )
        .route(
            "/api/channels/{channel}/disconnect",
            post(channel_routes::disconnect_handler),
        )
        .route("/api/messages/send", post(channel_routes::send_message_handler))
        .route(
            "/api/conversations/{id}/escalate",
            post(channel_routes::escalate_handler),
        )
        .route(
            "/api/conversations/{id}/resolve",
            post(channel_routes::resolve_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Bind and serve until shutdown.
pub async fn start(bind: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
