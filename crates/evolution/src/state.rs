use switchboard_channels::ConnectionStatus;

/// Connection state of an Evolution instance, as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    /// Paired and ready to send/receive.
    Open,
    /// QR issued, waiting for the scan.
    Connecting,
    /// Logged out or closed provider-side.
    Close,
    /// The instance does not exist on the bridge (terminal; requires
    /// re-initiation, not a retry).
    NotFound,
    /// Any state string this build does not know.
    Other(String),
}

impl InstanceState {
    #[must_use]
    pub fn from_provider(state: &str) -> Self {
        match state {
            "open" | "connected" => InstanceState::Open,
            "connecting" => InstanceState::Connecting,
            "close" | "disconnected" => InstanceState::Close,
            "not_found" => InstanceState::NotFound,
            other => InstanceState::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            InstanceState::Open => "open",
            InstanceState::Connecting => "connecting",
            InstanceState::Close => "close",
            InstanceState::NotFound => "not_found",
            InstanceState::Other(s) => s,
        }
    }

    /// The connection status this state maps onto.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        match self {
            InstanceState::Open => ConnectionStatus::Connected,
            InstanceState::Close | InstanceState::NotFound => ConnectionStatus::Disconnected,
            InstanceState::Connecting | InstanceState::Other(_) => ConnectionStatus::Pending,
        }
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
