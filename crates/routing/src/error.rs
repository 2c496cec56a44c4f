/// Crate-wide result type for routing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] switchboard_channels::Error),

    #[error(transparent)]
    Session(#[from] switchboard_sessions::Error),

    #[error(transparent)]
    Agent(#[from] switchboard_agents::Error),

    /// Reply generation (the external AI collaborator) failed.
    #[error("reply generation failed: {message}")]
    Reply { message: String },

    /// The inbound work queue is saturated; the event was not accepted.
    #[error("inbound queue is full")]
    QueueFull,
}

impl Error {
    #[must_use]
    pub fn reply(message: impl std::fmt::Display) -> Self {
        Self::Reply {
            message: message.to_string(),
        }
    }
}
