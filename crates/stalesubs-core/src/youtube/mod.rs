pub mod auth;
pub mod client;
pub mod types;

pub use auth::{Authenticator, ClientSecrets, StoredToken};
pub use client::{scan_activity_page, ScanControl, YouTubeClient};
