use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of supported messaging channels.
///
/// Dispatch over channels is always an exhaustive match on this enum; there
/// is no runtime plugin lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Whatsapp,
    Telegram,
    Evolution,
}

impl ChannelType {
    /// All supported channels, in display order.
    pub const ALL: [ChannelType; 3] = [
        ChannelType::Whatsapp,
        ChannelType::Telegram,
        ChannelType::Evolution,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Whatsapp => "whatsapp",
            ChannelType::Telegram => "telegram",
            ChannelType::Evolution => "evolution",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(ChannelType::Whatsapp),
            "telegram" => Ok(ChannelType::Telegram),
            "evolution" => Ok(ChannelType::Evolution),
            other => Err(Error::invalid_input(format!("unknown channel: {other}"))),
        }
    }
}
