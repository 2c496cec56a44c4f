//! HTTP gateway: provider webhook endpoints, the Meta OAuth callback, and
//! the operator API the dashboard talks to.
//!
//! Webhook handlers authenticate, parse, normalize, and enqueue — the
//! router pipeline runs on queue workers, so providers always get a fast
//! acknowledgement.

pub mod channel_routes;
pub mod evolution_routes;
pub mod server;
pub mod state;
pub mod telegram_routes;
pub mod whatsapp_routes;

pub use {
    server::{build_router, start},
    state::{AppState, build_app_state},
};
