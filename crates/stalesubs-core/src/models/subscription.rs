use serde::{Deserialize, Serialize};

use super::ChannelKey;

/// A channel the account is subscribed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Canonical channel ID
    pub channel_id: String,
    pub title: String,
}

impl Subscription {
    pub fn new(channel_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            title: title.into(),
        }
    }

    pub fn key(&self) -> ChannelKey {
        ChannelKey::canonical(self.channel_id.clone())
    }
}
