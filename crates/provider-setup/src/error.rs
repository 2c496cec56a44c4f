/// Crate-wide result type for setup flows.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Deployment configuration for a provider is incomplete.
    #[error("{provider} is not configured: missing {missing}")]
    NotConfigured {
        provider: &'static str,
        missing: &'static str,
    },

    /// Setup ran but the provider account is unusable (no business
    /// account, no phone number, ...).
    #[error("{message}")]
    Unusable { message: String },

    /// Underlying channel/store/adapter failure.
    #[error(transparent)]
    Channel(#[from] switchboard_channels::Error),
}

impl Error {
    #[must_use]
    pub fn not_configured(provider: &'static str, missing: &'static str) -> Self {
        Self::NotConfigured { provider, missing }
    }

    #[must_use]
    pub fn unusable(message: impl std::fmt::Display) -> Self {
        Self::Unusable {
            message: message.to_string(),
        }
    }
}
