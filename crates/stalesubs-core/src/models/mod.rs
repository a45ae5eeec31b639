pub mod channel_key;
pub mod classification;
pub mod subscription;
pub mod watch_event;

pub use channel_key::ChannelKey;
pub use classification::{ChannelStatus, Classification, StaleReason};
pub use subscription::Subscription;
pub use watch_event::WatchEvent;
