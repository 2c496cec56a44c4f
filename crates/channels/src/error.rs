/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across the connection store, adapters, and
/// everything that consumes them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// No connection exists for the requested organization and channel.
    #[error("{channel} connection not found for this organization")]
    NotFound { channel: String },

    /// A connection exists but is not in the `connected` state.
    #[error("{channel} connection is not active (status: {status})")]
    NotConnected { channel: String, status: String },

    /// A mutation would violate a uniqueness invariant.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Operation is currently unavailable (not configured/ready).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },

    /// A provider API call failed. Carries enough context for the audit
    /// log; callers own any retry policy.
    #[error("{provider} {operation} failed: {message}")]
    Provider {
        provider: String,
        operation: String,
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// Database operation failed.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(channel: impl std::fmt::Display) -> Self {
        Self::NotFound {
            channel: channel.to_string(),
        }
    }

    #[must_use]
    pub fn not_connected(channel: impl std::fmt::Display, status: impl std::fmt::Display) -> Self {
        Self::NotConnected {
            channel: channel.to_string(),
            status: status.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl std::fmt::Display) -> Self {
        Self::Conflict {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn provider(
        provider: impl std::fmt::Display,
        operation: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}
