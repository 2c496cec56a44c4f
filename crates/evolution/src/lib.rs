//! Evolution API adapter — the unofficial WhatsApp bridge.
//!
//! Unlike the first-party providers, Evolution needs an explicit instance
//! lifecycle: create a named instance, surface a QR code for the operator
//! to scan, then watch the connection state until the instance reports
//! `open`. Instance state checks treat a provider-side 404 as the
//! `not_found` state, never as a transport error.

pub mod adapter;
pub mod event;
pub mod state;

pub use {
    adapter::{EvolutionAdapter, QrCode, QrTiming},
    event::{ConnectionUpdateData, EventPayload, MessageData},
    state::InstanceState,
};
