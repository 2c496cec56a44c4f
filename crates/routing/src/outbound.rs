use std::sync::Arc;

use switchboard_channels::{ChannelAdapter, ChannelType, Error, Result};

/// Outbound dispatch over the closed channel set.
///
/// One slot per [`ChannelType`] variant, resolved by exhaustive match —
/// there is no runtime adapter registry to fall through. The Evolution
/// slot is optional because the bridge is a deployment choice.
pub struct OutboundDispatcher {
    whatsapp: Arc<dyn ChannelAdapter>,
    telegram: Arc<dyn ChannelAdapter>,
    evolution: Option<Arc<dyn ChannelAdapter>>,
}

impl OutboundDispatcher {
    pub fn new(
        whatsapp: Arc<dyn ChannelAdapter>,
        telegram: Arc<dyn ChannelAdapter>,
        evolution: Option<Arc<dyn ChannelAdapter>>,
    ) -> Self {
        Self {
            whatsapp,
            telegram,
            evolution,
        }
    }

    /// The adapter serving a channel.
    pub fn adapter(&self, channel: ChannelType) -> Result<&dyn ChannelAdapter> {
        match channel {
            ChannelType::Whatsapp => Ok(self.whatsapp.as_ref()),
            ChannelType::Telegram => Ok(self.telegram.as_ref()),
            ChannelType::Evolution => self
                .evolution
                .as_deref()
                .ok_or_else(|| Error::unavailable("evolution bridge is not configured")),
        }
    }
}
