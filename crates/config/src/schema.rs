use serde::{Deserialize, Serialize};

/// Root configuration for the switchboard server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub meta: MetaConfig,
    pub evolution: EvolutionConfig,
    pub telegram: TelegramConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Public-facing URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Externally reachable base URL of this server; webhook callback
    /// URLs are built from it.
    pub public_url: String,
    /// Tenant dashboard base URL, target of the OAuth redirects.
    pub dashboard_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:8080".into(),
            dashboard_url: "http://localhost:3000".into(),
        }
    }
}

/// SQLite database location. Defaults to `switchboard.db` in the working
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "switchboard.db".into(),
        }
    }
}

/// Meta app settings for WhatsApp Cloud API OAuth and webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub app_id: String,
    pub app_secret: String,
    pub redirect_uri: String,
    /// Static token echoed back during the webhook subscription handshake.
    pub verify_token: String,
    pub graph_base_url: String,
    /// OAuth dialog base.
    pub oauth_dialog_url: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            redirect_uri: String::new(),
            verify_token: String::new(),
            graph_base_url: "https://graph.facebook.com/v18.0".into(),
            oauth_dialog_url: "https://www.facebook.com/v18.0/dialog/oauth".into(),
        }
    }
}

/// Evolution bridge deployment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub base_url: String,
    pub api_key: String,
}

impl EvolutionConfig {
    /// Whether the bridge is configured at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".into(),
        }
    }
}
