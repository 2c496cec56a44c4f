use {
    axum::{
        Json,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    tracing::warn,
};

use {
    switchboard_channels::{ChannelType, Error as ChannelError},
    switchboard_common::OrgContext,
    switchboard_provider_setup::Error as SetupError,
    switchboard_routing::Error as RoutingError,
};

use crate::state::AppState;

fn error_body(message: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": message.to_string()}))
}

fn channel_error_response(e: &ChannelError) -> Response {
    let status = match e {
        ChannelError::InvalidInput { .. } | ChannelError::NotConnected { .. } => {
            StatusCode::BAD_REQUEST
        },
        ChannelError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChannelError::Conflict { .. } => StatusCode::CONFLICT,
        ChannelError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ChannelError::Provider { .. } => StatusCode::BAD_GATEWAY,
        ChannelError::SerdeJson(_) | ChannelError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error_body(e)).into_response()
}

fn setup_error_response(e: &SetupError) -> Response {
    match e {
        SetupError::NotConfigured { .. } | SetupError::Unusable { .. } => {
            (StatusCode::BAD_REQUEST, error_body(e)).into_response()
        },
        SetupError::Channel(inner) => channel_error_response(inner),
    }
}

fn routing_error_response(e: &RoutingError) -> Response {
    match e {
        RoutingError::Channel(inner) => channel_error_response(inner),
        RoutingError::Session(inner) => {
            let status = match inner {
                switchboard_sessions::Error::NotFound { .. } => StatusCode::NOT_FOUND,
                switchboard_sessions::Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, error_body(e)).into_response()
        },
        RoutingError::Agent(_) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(e)).into_response(),
        RoutingError::Reply { .. } => (StatusCode::BAD_GATEWAY, error_body(e)).into_response(),
        RoutingError::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, error_body(e)).into_response(),
    }
}

#[derive(Deserialize)]
pub struct OrgQuery {
    pub organization_id: String,
}

/// GET /api/channels — connection status list for the dashboard. The
/// credential bag never leaves the server.
pub async fn list_channels_handler(
    State(state): State<AppState>,
    Query(query): Query<OrgQuery>,
) -> Response {
    match state.connections.list(&query.organization_id).await {
        Ok(connections) => {
            let summaries: Vec<_> = connections
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "channel": c.channel,
                        "channel_account_id": c.channel_account_id,
                        "status": c.status,
                        "connected_at": c.connected_at,
                        "last_sync_at": c.last_sync_at,
                        "error_message": c.error_message,
                    })
                })
                .collect();
            Json(summaries).into_response()
        },
        Err(e) => channel_error_response(&e),
    }
}

/// GET /api/channels/whatsapp/authorize-url — start the Meta OAuth flow.
pub async fn whatsapp_authorize_url_handler(
    State(state): State<AppState>,
    Query(query): Query<OrgQuery>,
) -> Response {
    let ctx = OrgContext::new(query.organization_id);
    match state.whatsapp_setup.authorize_url(&ctx) {
        Ok(url) => Json(serde_json::json!({"authorization_url": url})).into_response(),
        Err(e) => setup_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct TelegramConnectRequest {
    pub organization_id: String,
    pub bot_token: String,
}

/// POST /api/channels/telegram/connect
pub async fn telegram_connect_handler(
    State(state): State<AppState>,
    Json(request): Json<TelegramConnectRequest>,
) -> Response {
    let ctx = OrgContext::new(request.organization_id);
    match state.telegram_setup.connect(&ctx, &request.bot_token).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            warn!(error = %e, "telegram connect failed");
            setup_error_response(&e)
        },
    }
}

#[derive(Deserialize)]
pub struct OrgBody {
    pub organization_id: String,
}

/// POST /api/channels/evolution/connect — create/reuse the instance and
/// return QR pairing material.
pub async fn evolution_connect_handler(
    State(state): State<AppState>,
    Json(request): Json<OrgBody>,
) -> Response {
    let Some(ref setup) = state.evolution_setup else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("evolution bridge is not configured"),
        )
            .into_response();
    };
    let ctx = OrgContext::new(request.organization_id);
    match setup.connect(&ctx).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            warn!(error = %e, "evolution connect failed");
            setup_error_response(&e)
        },
    }
}

#[derive(Deserialize)]
pub struct EvolutionStatusQuery {
    pub organization_id: String,
    pub instance: String,
}

/// GET /api/channels/evolution/status — one caller-driven poll tick.
pub async fn evolution_status_handler(
    State(state): State<AppState>,
    Query(query): Query<EvolutionStatusQuery>,
) -> Response {
    let Some(ref setup) = state.evolution_setup else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("evolution bridge is not configured"),
        )
            .into_response();
    };
    let ctx = OrgContext::new(query.organization_id);
    match setup.check_status(&ctx, &query.instance).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => setup_error_response(&e),
    }
}

/// POST /api/channels/{channel}/disconnect
pub async fn disconnect_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(request): Json<OrgBody>,
) -> Response {
    let channel: ChannelType = match channel.parse() {
        Ok(channel) => channel,
        Err(e) => return (StatusCode::BAD_REQUEST, error_body(e)).into_response(),
    };
    let ctx = OrgContext::new(request.organization_id);

    let result = match channel {
        ChannelType::Whatsapp => state.whatsapp_setup.disconnect(&ctx).await,
        ChannelType::Telegram => state.telegram_setup.disconnect(&ctx).await,
        ChannelType::Evolution => match state.evolution_setup {
            Some(ref setup) => setup.disconnect(&ctx).await,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_body("evolution bridge is not configured"),
                )
                    .into_response();
            },
        },
    };

    match result {
        Ok(()) => Json(serde_json::json!({"success": true})).into_response(),
        Err(e) => {
            warn!(%channel, error = %e, "disconnect failed");
            setup_error_response(&e)
        },
    }
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub organization_id: String,
    pub channel: ChannelType,
    pub external_user_id: String,
    pub text: String,
}

/// POST /api/messages/send — human-operator reply from the dashboard.
pub async fn send_message_handler(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Response {
    let ctx = OrgContext::new(request.organization_id);
    match state
        .router
        .send_outbound(&ctx, request.channel, &request.external_user_id, &request.text)
        .await
    {
        Ok(receipt) => Json(serde_json::json!({
            "success": true,
            "message_id": receipt.message_id,
        }))
        .into_response(),
        Err(e) => {
            warn!(channel = %request.channel, error = %e, "operator send failed");
            routing_error_response(&e)
        },
    }
}

/// POST /api/conversations/{id}/escalate — human takeover.
pub async fn escalate_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<OrgBody>,
) -> Response {
    let ctx = OrgContext::new(request.organization_id);
    match state.router.escalate(&ctx, &conversation_id).await {
        Ok(()) => Json(serde_json::json!({"success": true})).into_response(),
        Err(e) => routing_error_response(&e),
    }
}

/// POST /api/conversations/{id}/resolve — close the conversation.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<OrgBody>,
) -> Response {
    let ctx = OrgContext::new(request.organization_id);
    match state.router.resolve(&ctx, &conversation_id).await {
        Ok(()) => Json(serde_json::json!({"success": true})).into_response(),
        Err(e) => routing_error_response(&e),
    }
}
