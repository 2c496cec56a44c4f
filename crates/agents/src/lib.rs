//! Automated agent records, per-channel assignments, and the reply
//! generation seam.

pub mod error;
pub mod reply;
pub mod select;
pub mod store;

pub use {
    error::{Error, Result},
    reply::{EchoReplyGenerator, ReplyGenerator},
    select::select_agent_for_channel,
    store::{AgentStore, AiAgent, NewAgent, SqliteAgentStore},
};
