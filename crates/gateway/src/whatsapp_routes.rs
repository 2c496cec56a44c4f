use std::collections::HashMap;

use {
    axum::{
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Redirect, Response},
    },
    tracing::{debug, warn},
};

use {
    switchboard_channels::{ChannelType, InboundMessage, NewWebhookLogEntry},
    switchboard_common::OrgContext,
    switchboard_whatsapp::{WebhookPayload, verify_subscription},
};

use crate::state::AppState;

/// GET /webhooks/whatsapp — Meta subscription handshake.
///
/// Echoes the challenge when the static verify token matches; any other
/// GET is acknowledged without processing.
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").map(String::as_str);

    if mode == Some("subscribe") && challenge.is_some() {
        return match verify_subscription(mode, token, challenge, &state.config.meta.verify_token) {
            Some(challenge) => (StatusCode::OK, challenge).into_response(),
            None => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        };
    }
    (StatusCode::OK, "OK").into_response()
}

/// POST /webhooks/whatsapp — message delivery from Meta.
pub async fn webhook_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    // Malformed JSON is acknowledged, never retried into a storm.
    let Ok(payload) = serde_json::from_str::<WebhookPayload>(&body) else {
        debug!("ignoring unparseable whatsapp webhook body");
        return (StatusCode::OK, "OK").into_response();
    };

    let Some(value) = payload.first_value() else {
        return (StatusCode::OK, "OK").into_response();
    };

    let Some(phone_number_id) = value.metadata.as_ref().map(|m| m.phone_number_id.as_str())
    else {
        return (StatusCode::BAD_REQUEST, "Missing phone_number_id").into_response();
    };

    let connection = match state
        .connections
        .get_by_account_id(ChannelType::Whatsapp, phone_number_id)
        .await
    {
        Ok(Some(connection)) => connection,
        Ok(None) => {
            warn!(phone_number_id, "whatsapp webhook for unknown account");
            return (StatusCode::NOT_FOUND, "Account not found").into_response();
        },
        Err(e) => {
            warn!(error = %e, "whatsapp webhook connection lookup failed");
            return (StatusCode::OK, "OK").into_response();
        },
    };

    // Delivery webhooks may carry the per-connection token; when they do,
    // it must match.
    if let Some(token) = params.get("hub.verify_token")
        && connection.credentials.webhook_token.as_deref() != Some(token.as_str())
    {
        warn!(
            organization_id = %connection.organization_id,
            "whatsapp webhook token mismatch"
        );
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    if let Some(message) = value.messages.first()
        && let Some(text) = message.text_body()
    {
        let event = InboundMessage {
            channel: ChannelType::Whatsapp,
            organization_id: connection.organization_id.clone(),
            // Meta omits the leading + on sender numbers.
            external_user_id: format!("+{}", message.from),
            text: text.to_string(),
            external_message_id: Some(message.id.clone()),
            sender_name: payload.sender_name(&message.from).map(str::to_string),
        };
        enqueue_or_log(&state, event).await;
    }

    if let Some(status) = value.statuses.first() {
        debug!(status = %status.status, message_id = %status.id, "whatsapp status update");
    }

    (StatusCode::OK, "OK").into_response()
}

/// GET /webhooks/whatsapp/callback — Meta OAuth redirect target.
///
/// Always answers with a redirect to the dashboard; OAuth providers never
/// see a raw 500.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (Some(code), Some(org_state)) = (params.get("code"), params.get("state")) else {
        return (StatusCode::BAD_REQUEST, "Missing code or state parameter").into_response();
    };

    let dashboard = state.config.app.dashboard_url.trim_end_matches('/');
    let ctx = OrgContext::new(org_state.clone());
    match state.whatsapp_setup.handle_callback(&ctx, code).await {
        Ok(outcome) => {
            let target = format!("{dashboard}/{}/integrations?whatsapp=connected", outcome.organization_id);
            Redirect::to(&target).into_response()
        },
        Err(e) => {
            warn!(organization_id = %org_state, error = %e, "whatsapp oauth callback failed");
            let target = format!(
                "{dashboard}/integrations?whatsapp_error={}",
                urlencoding::encode(&e.to_string())
            );
            Redirect::to(&target).into_response()
        },
    }
}

/// Enqueue an event, recording refusals in the webhook log so saturation
/// is visible in diagnostics.
pub(crate) async fn enqueue_or_log(state: &AppState, event: InboundMessage) {
    if state.queue.try_enqueue(event.clone()).is_err() {
        let payload = serde_json::to_value(&event).unwrap_or_default();
        let entry = NewWebhookLogEntry::failure(
            &event.organization_id,
            event.channel,
            "message",
            "inbound queue full, event dropped",
            payload,
        );
        if let Err(e) = state.webhook_log.record(entry).await {
            warn!(error = %e, "failed to record dropped event");
        }
    }
}
