use std::fmt;

const CHANNEL_PATH: &str = "/channel/";
const HANDLE_PATH: &str = "/@";

/// A normalized channel reference.
///
/// The variant is the form tag: a handle never equals a canonical ID, even
/// when both name the same channel. Handles must go through resolution before
/// they can match a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKey {
    /// Platform channel ID, e.g. `UCxxxxxxxxxxxxxxxxxxxxxx`
    Canonical(String),
    /// `@name`, lowercased
    Handle(String),
}

impl ChannelKey {
    /// Classify a raw reference.
    ///
    /// `@name` is a handle; anything starting with `canonical_prefix` is a
    /// canonical ID; anything else is treated as a bare handle (older exports
    /// carry legacy usernames without the sigil). Blank input yields `None`.
    pub fn parse(raw: &str, canonical_prefix: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with('@') {
            return Self::handle(raw);
        }
        if raw.starts_with(canonical_prefix) {
            return Some(Self::Canonical(raw.to_string()));
        }
        Self::handle(raw)
    }

    /// Build a canonical key without inspecting the prefix.
    /// Used for IDs that come straight from the API.
    pub fn canonical(id: impl Into<String>) -> Self {
        Self::Canonical(id.into())
    }

    /// Normalize a handle with or without its leading `@`
    pub fn handle(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() {
            return None;
        }
        Some(Self::Handle(format!("@{}", name.to_lowercase())))
    }

    /// Extract the reference from a channel URL such as
    /// `https://www.youtube.com/channel/UC...` or `https://www.youtube.com/@name`.
    ///
    /// Returns `None` when the URL has neither path segment.
    pub fn from_channel_url(url: &str, canonical_prefix: &str) -> Option<Self> {
        if let Some(idx) = url.find(CHANNEL_PATH) {
            let rest = first_segment(&url[idx + CHANNEL_PATH.len()..]);
            return Self::parse(rest, canonical_prefix);
        }
        if let Some(idx) = url.find(HANDLE_PATH) {
            let rest = first_segment(&url[idx + HANDLE_PATH.len()..]);
            // Non-ASCII handles arrive percent-encoded; undecodable ones stay as written
            return match urlencoding::decode(rest) {
                Ok(decoded) => Self::handle(&decoded),
                Err(_) => Self::handle(rest),
            };
        }
        None
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, Self::Handle(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(id) => id,
            Self::Handle(handle) => handle,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut a URL tail at the next path, query or fragment delimiter
fn first_segment(tail: &str) -> &str {
    tail.split(['/', '?', '#']).next().unwrap_or("")
}
