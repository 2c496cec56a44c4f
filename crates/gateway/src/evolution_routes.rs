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
    switchboard_common::OrgContext,
    switchboard_evolution::EventPayload,
};

use crate::{state::AppState, whatsapp_routes::enqueue_or_log};

/// POST /webhooks/evolution?token=T&instance=I — events from the bridge.
pub async fn webhook_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(token) = params.get("token") else {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    let connection = match state
        .connections
        .get_by_webhook_token(ChannelType::Evolution, token)
        .await
    {
        Ok(Some(connection)) => connection,
        Ok(None) => {
            warn!("evolution webhook with unknown token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        },
        Err(e) => {
            warn!(error = %e, "evolution webhook connection lookup failed");
            return (StatusCode::OK, "OK").into_response();
        },
    };

    // The webhook URL pins the instance it was registered for.
    if let Some(instance) = params.get("instance")
        && instance != &connection.channel_account_id
    {
        warn!(
            instance,
            expected = %connection.channel_account_id,
            "evolution webhook instance mismatch"
        );
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let Ok(event) = serde_json::from_str::<EventPayload>(&body) else {
        debug!("ignoring unparseable evolution event");
        return (StatusCode::OK, "OK").into_response();
    };

    match event.event.as_str() {
        "messages.upsert" => {
            let Some(data) = event.message_data() else {
                return (StatusCode::OK, "OK").into_response();
            };
            // Self-originated echoes are not inbound traffic.
            if data.key.from_me {
                return (StatusCode::OK, "OK").into_response();
            }
            let (Some(number), Some(text)) = (data.sender_number(), data.text()) else {
                return (StatusCode::OK, "OK").into_response();
            };

            let inbound = InboundMessage {
                channel: ChannelType::Evolution,
                organization_id: connection.organization_id.clone(),
                external_user_id: number.to_string(),
                text: text.to_string(),
                external_message_id: Some(data.key.id.clone()),
                sender_name: data.push_name.clone(),
            };
            enqueue_or_log(&state, inbound).await;
        },
        "connection.update" => {
            if let Some(update) = event.connection_update()
                && let Some(ref setup) = state.evolution_setup
            {
                let ctx = OrgContext::new(connection.organization_id.clone());
                if let Err(e) = setup
                    .update_connection_status(&ctx, &event.instance, &update.state)
                    .await
                {
                    warn!(instance = %event.instance, error = %e, "connection update failed");
                }
            }
        },
        other => {
            debug!(event = other, "ignoring evolution event");
        },
    }

    (StatusCode::OK, "OK").into_response()
}
