/// Crate-wide result type for agent operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("agent not found")]
    NotFound,

    #[error("invalid agent input: {message}")]
    InvalidInput { message: String },

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
}
