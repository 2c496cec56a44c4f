//! Contact sessions, conversations, and the thread message log.
//!
//! A contact session is the platform identity of one external end user on
//! one channel; a conversation is the support-ticket aggregate tied 1:1 to
//! a session and backed by an append-only message thread.

pub mod contact;
pub mod conversation;
pub mod error;
pub mod thread;

pub use {
    contact::{ContactSession, ContactSessionStore, NewContactSession, SqliteContactSessionStore},
    conversation::{
        Conversation, ConversationStatus, ConversationStore, NewConversation,
        SqliteConversationStore,
    },
    error::{Error, Result},
    thread::{MessageRole, SqliteThreadLog, ThreadLog, ThreadMessage},
};
