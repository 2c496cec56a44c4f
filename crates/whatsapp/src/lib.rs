//! WhatsApp Business Cloud API adapter (Meta Graph API).
//!
//! Outbound sends and OAuth account discovery are plain Graph REST calls
//! with a bearer token; webhook subscription is platform-side, so the
//! adapter's registration hooks are no-ops and inbound auth happens via
//! the verify-token handshake plus the per-connection webhook token.

pub mod adapter;
pub mod api;
pub mod payload;
pub mod phone;
pub mod verify;

pub use {
    adapter::WhatsAppAdapter,
    api::{BusinessAccount, GraphUser, PhoneNumber, TokenResponse},
    payload::WebhookPayload,
    phone::{format_phone_display, normalize_phone},
    verify::verify_subscription,
};

/// Default Graph API base URL (versioned).
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v18.0";
