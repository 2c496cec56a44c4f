//! The conversation router: turns normalized inbound events into
//! session/conversation state, thread appends, agent replies, and outbound
//! sends, behind a bounded work queue so webhook acks never wait on reply
//! generation.

pub mod error;
pub mod outbound;
pub mod queue;
pub mod router;
pub mod settings;

pub use {
    error::{Error, Result},
    outbound::OutboundDispatcher,
    queue::InboundQueue,
    router::{Router, RouterServices},
    settings::{DEFAULT_GREETING, OrgSettings, SettingsStore, SqliteSettingsStore},
};
