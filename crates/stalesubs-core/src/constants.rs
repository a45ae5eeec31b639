//! Application-wide constants
//!
//! Defaults that the JSON config may override live in `config.rs`; the values
//! here are fixed by the platform or by file naming conventions.

/// Default lookback window in days
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// Prefix carried by every canonical channel ID
pub const CANONICAL_ID_PREFIX: &str = "UC";

/// Fixed name of the watch-history export in the working directory
pub const DEFAULT_EXPORT_FILE: &str = "watch-history.json";

pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
pub const DEFAULT_HANDLE_CACHE_FILE: &str = "handle_cache.json";

/// Config file looked up in the working directory when `--config` is absent
pub const LOCAL_CONFIG_FILE: &str = "stalesubs.json";

/// Base URL of the YouTube Data API v3
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Deep link prefix used in reports
pub const CHANNEL_URL_BASE: &str = "https://www.youtube.com/channel/";

/// Page size for paginated list calls (API maximum)
pub const PAGE_SIZE: u32 = 50;

/// Request timeout for all API calls
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// OAuth endpoints and scope
pub mod oauth {
    pub const DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
    pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";
    pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
    /// Tokens expiring within this many seconds are refreshed up front
    pub const EXPIRY_SKEW_SECS: i64 = 60;
}
