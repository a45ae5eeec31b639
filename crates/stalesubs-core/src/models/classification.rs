use std::fmt;

use chrono::NaiveDateTime;

use crate::constants::CHANNEL_URL_BASE;

/// Why a subscription counts as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    NoActivity,
    LastWatched(NaiveDateTime),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActivity => f.write_str("No viewing activity found"),
            Self::LastWatched(at) => write!(f, "Last watched {}", at.format("%Y-%m-%d")),
        }
    }
}

/// Outcome for a single subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub title: String,
    pub channel_id: String,
    pub last_watched: Option<NaiveDateTime>,
    /// Set for stale entries only
    pub reason: Option<StaleReason>,
}

impl ChannelStatus {
    pub fn url(&self) -> String {
        format!("{}{}", CHANNEL_URL_BASE, self.channel_id)
    }
}

/// Subscriptions split by recency, each side in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub stale: Vec<ChannelStatus>,
    pub active: Vec<ChannelStatus>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.stale.len() + self.active.len()
    }
}
