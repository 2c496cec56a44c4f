//! Shared types and utilities used across all switchboard crates.

pub mod token;
pub mod types;

pub use types::OrgContext;

/// Current unix time in milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
