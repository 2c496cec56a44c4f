//! End-to-end webhook tests against the full router stack, with provider
//! APIs mocked at the HTTP layer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    axum::{
        body::Body,
        http::{Request, StatusCode, header},
    },
    sqlx::SqlitePool,
    tower::ServiceExt,
};

use {
    switchboard_agents::{AgentStore, EchoReplyGenerator, NewAgent, SqliteAgentStore},
    switchboard_channels::{
        ChannelType, ConnectionStatus, ConnectionStore, Credentials, NewConnection,
    },
    switchboard_config::SwitchboardConfig,
    switchboard_gateway::{AppState, build_app_state, build_router},
    switchboard_sessions::{
        ContactSessionStore, ConversationStore, SqliteContactSessionStore,
        SqliteConversationStore, SqliteThreadLog, ThreadLog,
    },
};

struct TestEnv {
    state: AppState,
    pool: SqlitePool,
    // Keeps the database file alive for the test's duration.
    _dir: tempfile::TempDir,
}

async fn test_env(config: SwitchboardConfig) -> TestEnv {
    // File-backed database: queue workers and the test run on separate
    // pool connections, which must see the same data.
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("gateway.db").display());
    let pool = SqlitePool::connect(&url).await.unwrap();
    let state = build_app_state(config, pool.clone(), Arc::new(EchoReplyGenerator))
        .await
        .unwrap();
    TestEnv {
        state,
        pool,
        _dir: dir,
    }
}

fn base_config() -> SwitchboardConfig {
    let mut config = SwitchboardConfig::default();
    config.meta.verify_token = "static-verify".into();
    config
}

async fn seed_telegram_connection(state: &AppState, webhook_token: &str) {
    state
        .connections
        .upsert(NewConnection {
            organization_id: "org_1".into(),
            channel: ChannelType::Telegram,
            channel_account_id: "@acme_bot".into(),
            credentials: Credentials {
                api_key: Some("123:abc".into()),
                webhook_token: Some(webhook_token.into()),
                ..Credentials::default()
            },
            channel_metadata: serde_json::json!({}),
            status: ConnectionStatus::Connected,
            error_message: None,
        })
        .await
        .unwrap();
}

async fn seed_default_agent(pool: &SqlitePool) {
    SqliteAgentStore::new(pool.clone())
        .create(NewAgent {
            organization_id: "org_1".into(),
            name: "Support".into(),
            instructions: "Answer customer questions.".into(),
            is_default: true,
        })
        .await
        .unwrap();
}

fn telegram_update(chat_id: i64, text: &str, message_id: i64) -> String {
    serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": message_id,
            "from": {"id": chat_id, "is_bot": false, "first_name": "Ana"},
            "chat": {"id": chat_id, "type": "private", "first_name": "Ana"},
            "date": 1_688_000_000,
            "text": text,
        }
    })
    .to_string()
}

async fn post_json(state: &AppState, uri: &str, body: String) -> (StatusCode, String) {
    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, String, Option<String>) {
    let app = build_router(state.clone());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).to_string(), location)
}

#[tokio::test]
async fn telegram_webhook_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let send = server
        .mock("POST", "/bot123:abc/sendMessage")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"message_id":9,"chat":{"id":555,"type":"private"}}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = base_config();
    config.telegram.api_base_url = server.url();
    let env = test_env(config).await;
    seed_telegram_connection(&env.state, "tok123").await;
    seed_default_agent(&env.pool).await;

    let (status, body) =
        post_json(&env.state, "/webhooks/telegram?token=tok123", telegram_update(555, "hello", 42))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    // The pipeline runs on queue workers; wait for it to land.
    let contacts = SqliteContactSessionStore::new(env.pool.clone());
    let conversations = SqliteConversationStore::new(env.pool.clone());
    let threads = SqliteThreadLog::new(env.pool.clone());

    let mut transcript = Vec::new();
    for _ in 0..100 {
        if let Some(session) = contacts
            .get_by_identity(ChannelType::Telegram, "555", "org_1")
            .await
            .unwrap()
            && let Some(conversation) =
                conversations.get_by_contact_session(&session.id).await.unwrap()
        {
            transcript = threads.list_last(&conversation.thread_id, 10).await.unwrap();
            if transcript.len() >= 3 {
                assert_eq!(
                    conversation.status,
                    switchboard_sessions::ConversationStatus::Unresolved
                );
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(transcript.len(), 3, "expected greeting + user + reply");
    assert_eq!(transcript[1].body, "hello");
    assert_eq!(transcript[2].body, "Echo: hello");
    send.assert_async().await;
}

#[tokio::test]
async fn telegram_webhook_rejects_unknown_token() {
    let env = test_env(base_config()).await;
    seed_telegram_connection(&env.state, "tok123").await;

    let (status, _) =
        post_json(&env.state, "/webhooks/telegram?token=wrong", telegram_update(555, "hello", 42))
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No side effects: no contact session was created.
    let contacts = SqliteContactSessionStore::new(env.pool.clone());
    assert!(contacts
        .get_by_identity(ChannelType::Telegram, "555", "org_1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn telegram_webhook_requires_a_token() {
    let env = test_env(base_config()).await;
    let (status, _) =
        post_json(&env.state, "/webhooks/telegram", telegram_update(555, "hello", 42)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authenticated_payload_is_acknowledged() {
    let env = test_env(base_config()).await;
    seed_telegram_connection(&env.state, "tok123").await;

    let (status, _) = post_json(
        &env.state,
        "/webhooks/telegram?token=tok123",
        "this is not json".to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Non-text updates are acknowledged too.
    let (status, _) = post_json(
        &env.state,
        "/webhooks/telegram?token=tok123",
        serde_json::json!({
            "update_id": 2,
            "message": {
                "message_id": 43,
                "from": {"id": 555, "is_bot": false, "first_name": "Ana"},
                "chat": {"id": 555, "type": "private"},
                "date": 1_688_000_001
            }
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bot_echoes_are_ignored() {
    let env = test_env(base_config()).await;
    seed_telegram_connection(&env.state, "tok123").await;

    let (status, _) = post_json(
        &env.state,
        "/webhooks/telegram?token=tok123",
        serde_json::json!({
            "update_id": 3,
            "message": {
                "message_id": 44,
                "from": {"id": 1, "is_bot": true, "first_name": "Bot"},
                "chat": {"id": 555, "type": "private"},
                "date": 1_688_000_002,
                "text": "I am a bot"
            }
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let contacts = SqliteContactSessionStore::new(env.pool.clone());
    assert!(contacts
        .get_by_identity(ChannelType::Telegram, "555", "org_1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn whatsapp_handshake_echoes_challenge() {
    let env = test_env(base_config()).await;

    let (status, body, _) = get(
        &env.state,
        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=static-verify&hub.challenge=42",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "42");

    let (status, _, _) = get(
        &env.state,
        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=42",
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn whatsapp_webhook_requires_phone_number_id() {
    let env = test_env(base_config()).await;

    let (status, _) = post_json(
        &env.state,
        "/webhooks/whatsapp",
        serde_json::json!({
            "entry": [{"changes": [{"value": {"messages": []}}]}]
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An empty envelope is silently ignored.
    let (status, _) = post_json(&env.state, "/webhooks/whatsapp", "{}".to_string()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn whatsapp_webhook_unknown_account_is_404() {
    let env = test_env(base_config()).await;

    let (status, _) = post_json(
        &env.state,
        "/webhooks/whatsapp",
        serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "no-such-account"},
                "messages": [{"from": "5511999999999", "id": "wamid.1", "type": "text",
                              "text": {"body": "hi"}}]
            }}]}]
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oauth_callback_requires_parameters() {
    let env = test_env(base_config()).await;
    let (status, _, _) = get(&env.state, "/webhooks/whatsapp/callback?code=only-code").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oauth_callback_failure_redirects_with_error() {
    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/oauth/access_token")
        .with_status(400)
        .with_body(r#"{"error":{"message":"bad code"}}"#)
        .create_async()
        .await;

    let mut config = base_config();
    config.meta.app_id = "app1".into();
    config.meta.app_secret = "secret1".into();
    config.meta.redirect_uri = "https://app.example.com/webhooks/whatsapp/callback".into();
    config.meta.graph_base_url = server.url();
    let env = test_env(config).await;

    let (status, _, location) =
        get(&env.state, "/webhooks/whatsapp/callback?code=bad&state=org_1").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(location.unwrap().contains("whatsapp_error="));
}

#[tokio::test]
async fn evolution_webhook_rejects_unknown_token() {
    let env = test_env(base_config()).await;
    let (status, _) = post_json(
        &env.state,
        "/webhooks/evolution?token=nope&instance=org_1_000001",
        serde_json::json!({"event": "messages.upsert", "instance": "org_1_000001", "data": {}})
            .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn operator_send_without_connection_is_404() {
    let env = test_env(base_config()).await;
    let (status, body) = post_json(
        &env.state,
        "/api/messages/send",
        serde_json::json!({
            "organization_id": "org_1",
            "channel": "telegram",
            "external_user_id": "555",
            "text": "hello"
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("error"));
}
