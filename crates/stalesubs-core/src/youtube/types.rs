//! Response shapes of the YouTube Data API v3 calls we make.
//! Only the fields we read are declared, all of them lenient.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::history::parse_timestamp;
use crate::models::Subscription;

const VIDEO_KIND: &str = "youtube#video";

/// One page of a paginated list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

// =============================================================================
// subscriptions.list
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub snippet: SubscriptionSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub resource_id: ResourceId,
}

impl SubscriptionItem {
    /// `None` when the item does not name a channel
    pub fn into_subscription(self) -> Option<Subscription> {
        let channel_id = self.snippet.resource_id.channel_id?;
        Some(Subscription::new(channel_id, self.snippet.title))
    }
}

// =============================================================================
// channels.list
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub id: String,
}

// =============================================================================
// activities.list
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(default)]
    pub snippet: ActivitySnippet,
    #[serde(default)]
    pub content_details: Option<ActivityContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnippet {
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityContentDetails {
    #[serde(default)]
    pub playlist_item: Option<PlaylistItemDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemDetails {
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

impl ActivityItem {
    pub fn published_at(&self) -> Option<NaiveDateTime> {
        self.snippet.published_at.as_deref().and_then(parse_timestamp)
    }

    /// Channel the activity points at.
    ///
    /// A playlist item's resource channel wins; otherwise the snippet channel
    /// counts only when the activity is about a video.
    pub fn channel_id(&self) -> Option<&str> {
        let from_playlist = self
            .content_details
            .as_ref()
            .and_then(|d| d.playlist_item.as_ref())
            .and_then(|p| p.resource_id.as_ref())
            .and_then(|r| r.channel_id.as_deref());
        if from_playlist.is_some() {
            return from_playlist;
        }

        let is_video = self
            .snippet
            .resource_id
            .as_ref()
            .and_then(|r| r.kind.as_deref())
            == Some(VIDEO_KIND);
        if is_video {
            self.snippet.channel_id.as_deref()
        } else {
            None
        }
    }
}

/// Error body returned by Google APIs
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_page() {
        let page: Page<SubscriptionItem> = serde_json::from_value(json!({
            "kind": "youtube#subscriptionListResponse",
            "nextPageToken": "CDIQAA",
            "items": [
                { "snippet": { "title": "Chan A", "resourceId": { "kind": "youtube#channel", "channelId": "UCa" } } },
                { "snippet": { "title": "Broken" } }
            ]
        }))
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("CDIQAA"));
        let subs: Vec<_> = page
            .items
            .into_iter()
            .filter_map(SubscriptionItem::into_subscription)
            .collect();
        assert_eq!(subs, vec![Subscription::new("UCa", "Chan A")]);
    }

    #[test]
    fn test_empty_page_without_items() {
        let page: Page<ChannelItem> = serde_json::from_value(json!({ "pageInfo": {} })).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_activity_channel_from_playlist_item() {
        let item: ActivityItem = serde_json::from_value(json!({
            "snippet": { "publishedAt": "2024-04-01T10:00:00Z", "channelId": "UCself" },
            "contentDetails": { "playlistItem": { "resourceId": { "kind": "youtube#video", "channelId": "UCother" } } }
        }))
        .unwrap();
        assert_eq!(item.channel_id(), Some("UCother"));
        assert!(item.published_at().is_some());
    }

    #[test]
    fn test_activity_channel_from_video_snippet() {
        let item: ActivityItem = serde_json::from_value(json!({
            "snippet": {
                "publishedAt": "2024-04-01T10:00:00Z",
                "channelId": "UCvid",
                "resourceId": { "kind": "youtube#video", "videoId": "abc" }
            }
        }))
        .unwrap();
        assert_eq!(item.channel_id(), Some("UCvid"));
    }

    #[test]
    fn test_activity_without_video_resource() {
        let item: ActivityItem = serde_json::from_value(json!({
            "snippet": { "publishedAt": "2024-04-01T10:00:00Z", "channelId": "UCself" },
            "contentDetails": { "upload": { "videoId": "abc" } }
        }))
        .unwrap();
        assert_eq!(item.channel_id(), None);
    }
}
