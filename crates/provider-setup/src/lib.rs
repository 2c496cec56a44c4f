//! Connection-setup orchestrators, one per provider.
//!
//! Each orchestrator drives the provider-specific handshake (Meta OAuth
//! code exchange, Telegram token validation, Evolution QR pairing) and is
//! the only writer of connection records. Tenant identity arrives as an
//! explicit [`OrgContext`] on every call.

pub mod error;
pub mod evolution;
pub mod telegram;
pub mod whatsapp;

pub use {
    error::{Error, Result},
    evolution::{EvolutionConnectOutcome, EvolutionSetup, EvolutionStatusReport},
    telegram::{TelegramConnectOutcome, TelegramSetup},
    whatsapp::{WhatsAppCallbackOutcome, WhatsAppSetup},
};

use switchboard_common::OrgContext;

/// Webhook callback URL for a channel, built from the public base URL.
#[must_use]
pub fn webhook_url(public_url: &str, channel: &str, query: &str) -> String {
    let base = public_url.trim_end_matches('/');
    if query.is_empty() {
        format!("{base}/webhooks/{channel}")
    } else {
        format!("{base}/webhooks/{channel}?{query}")
    }
}

/// Short tenant tag used in provider-side resource names.
#[must_use]
pub fn org_short_tag(ctx: &OrgContext) -> String {
    let stripped = ctx
        .organization_id
        .strip_prefix("org_")
        .unwrap_or(&ctx.organization_id);
    stripped.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_url_joins_cleanly() {
        assert_eq!(
            webhook_url("https://app.example.com/", "telegram", "token=t1"),
            "https://app.example.com/webhooks/telegram?token=t1"
        );
        assert_eq!(
            webhook_url("https://app.example.com", "whatsapp", ""),
            "https://app.example.com/webhooks/whatsapp"
        );
    }

    #[test]
    fn org_tag_strips_prefix_and_truncates() {
        assert_eq!(org_short_tag(&OrgContext::new("org_2abcdefghijk")), "2abcdefg");
        assert_eq!(org_short_tag(&OrgContext::new("plain")), "plain");
    }
}
