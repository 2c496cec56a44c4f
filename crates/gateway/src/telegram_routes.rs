use std::collections::HashMap;

use {
    axum::{
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::{debug, warn},
};

use {
    switchboard_channels::{ChannelType, InboundMessage},
    switchboard_telegram::Update,
};

use crate::{state::AppState, whatsapp_routes::enqueue_or_log};

/// POST /webhooks/telegram?token=T — update delivery from the Bot API.
pub async fn webhook_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(token) = params.get("token") else {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    let Ok(update) = serde_json::from_str::<Update>(&body) else {
        debug!("ignoring unparseable telegram update");
        return (StatusCode::OK, "OK").into_response();
    };

    // Non-text updates and bot echoes are acknowledged and dropped.
    let Some(message) = update.any_message() else {
        return (StatusCode::OK, "OK").into_response();
    };
    let Some(text) = message.text.as_deref() else {
        return (StatusCode::OK, "OK").into_response();
    };
    if message.from.as_ref().is_some_and(|f| f.is_bot) {
        return (StatusCode::OK, "OK").into_response();
    }

    let connection = match state
        .connections
        .get_by_webhook_token(ChannelType::Telegram, token)
        .await
    {
        Ok(Some(connection)) => connection,
        Ok(None) => {
            warn!("telegram webhook with unknown token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        },
        Err(e) => {
            warn!(error = %e, "telegram webhook connection lookup failed");
            return (StatusCode::OK, "OK").into_response();
        },
    };

    let sender_name = message.from.as_ref().map(|f| f.first_name.clone());
    let event = InboundMessage {
        channel: ChannelType::Telegram,
        organization_id: connection.organization_id.clone(),
        external_user_id: message.chat.id.to_string(),
        text: text.to_string(),
        external_message_id: Some(message.message_id.to_string()),
        sender_name,
    };
    enqueue_or_log(&state, event).await;

    (StatusCode::OK, "OK").into_response()
}
