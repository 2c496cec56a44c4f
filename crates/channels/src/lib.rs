//! Channel domain core.
//!
//! Defines the closed set of supported channels, the per-(organization,
//! channel) connection record with its credential bag, the uniform adapter
//! capability trait each provider implements, the normalized inbound
//! message event, and the append-only webhook audit log.

pub mod adapter;
pub mod connection;
pub mod error;
pub mod store;
pub mod types;
pub mod webhook_log;

pub use {
    adapter::{ChannelAdapter, InboundMessage, ProviderIdentity, SendReceipt},
    connection::{ChannelConnection, ConnectionStatus, Credentials, NewConnection},
    error::{Error, Result},
    store::{ConnectionStore, SqliteConnectionStore},
    types::ChannelType,
    webhook_log::{NewWebhookLogEntry, SqliteWebhookLog, WebhookLog, WebhookLogEntry},
};
