use chrono::NaiveDateTime;

use super::ChannelKey;

/// One piece of evidence that a channel was watched at a point in time (UTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub channel: ChannelKey,
    pub watched_at: NaiveDateTime,
}

impl WatchEvent {
    pub fn new(channel: ChannelKey, watched_at: NaiveDateTime) -> Self {
        Self { channel, watched_at }
    }
}
