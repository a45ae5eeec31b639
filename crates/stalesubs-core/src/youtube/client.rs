use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::types::{ActivityItem, ApiErrorBody, ChannelItem, Page, SubscriptionItem};
use crate::constants::{HTTP_TIMEOUT_SECS, PAGE_SIZE, YOUTUBE_API_BASE};
use crate::models::{ChannelKey, Subscription, WatchEvent};
use crate::pipeline::{ActivitySource, SubscriptionSource};
use crate::resolve::HandleLookup;

/// Whether a scan over a reverse-chronological feed should keep paging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    ReachedCutoff,
}

/// Collect watch events from one page of the activity feed.
///
/// The feed is newest-first, so the first item older than `cutoff` ends the
/// whole scan. Items without a timestamp or channel are passed over.
pub fn scan_activity_page(
    items: &[ActivityItem],
    cutoff: NaiveDateTime,
    canonical_prefix: &str,
    events: &mut Vec<WatchEvent>,
) -> ScanControl {
    for item in items {
        let Some(published_at) = item.published_at() else {
            continue;
        };
        if published_at < cutoff {
            return ScanControl::ReachedCutoff;
        }
        if let Some(channel) = item
            .channel_id()
            .and_then(|id| ChannelKey::parse(id, canonical_prefix))
        {
            events.push(WatchEvent::new(channel, published_at));
        }
    }
    ScanControl::Continue
}

/// Error line for a failed call, preferring the code and message of a Google
/// error body over the raw response text
fn describe_api_error(status: reqwest::StatusCode, resource: &str, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if parsed.error.code != 0 => format!(
            "YouTube API error {} on {}: {}",
            parsed.error.code, resource, parsed.error.message
        ),
        Ok(parsed) => format!(
            "YouTube API error ({}) on {}: {}",
            status, resource, parsed.error.message
        ),
        Err(_) => format!("YouTube API error ({}) on {}: {}", status, resource, body),
    }
}

/// YouTube Data API client authorized with an OAuth access token
pub struct YouTubeClient {
    access_token: String,
    client: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            access_token,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", YOUTUBE_API_BASE, resource);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to YouTube API ({})", resource))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("{}", describe_api_error(status, resource, &error_text));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse YouTube {} response", resource))
    }

    /// Fetch every subscription of the authorized account
    pub async fn fetch_subscriptions(&self) -> Result<Vec<Subscription>> {
        info!("Fetching your YouTube subscriptions...");
        let page_size = PAGE_SIZE.to_string();
        let mut subscriptions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet"),
                ("mine", "true"),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: Page<SubscriptionItem> = self.get_json("subscriptions", &query).await?;
            let before = subscriptions.len();
            subscriptions.extend(
                page.items
                    .into_iter()
                    .filter_map(SubscriptionItem::into_subscription),
            );
            debug!("Subscription page had {} entries", subscriptions.len() - before);
            info!("  Fetched {} subscriptions so far...", subscriptions.len());

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Total subscriptions found: {}", subscriptions.len());
        Ok(subscriptions)
    }

    /// Exact handle lookup; `Ok(None)` when no channel owns the handle
    pub async fn channel_id_for_handle(&self, handle: &str) -> Result<Option<String>> {
        let page: Page<ChannelItem> = self
            .get_json("channels", &[("part", "id"), ("forHandle", handle)])
            .await?;
        Ok(page.items.into_iter().next().map(|item| item.id))
    }

    /// Walk the activity feed back to `cutoff`.
    /// Returns the events gathered and the error that stopped the walk early, if any.
    pub async fn fetch_activity(
        &self,
        cutoff: NaiveDateTime,
        canonical_prefix: &str,
    ) -> (Vec<WatchEvent>, Option<anyhow::Error>) {
        info!(
            "Fetching your activity feed (looking back to {})...",
            cutoff.format("%Y-%m-%d")
        );
        let page_size = PAGE_SIZE.to_string();
        let mut events = Vec::new();
        let mut checked = 0usize;
        let mut page_token: Option<String> = None;

        let failure = loop {
            let mut query = vec![
                ("part", "snippet,contentDetails"),
                ("mine", "true"),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: Page<ActivityItem> = match self.get_json("activities", &query).await {
                Ok(page) => page,
                Err(e) => break Some(e),
            };
            checked += page.items.len();

            if scan_activity_page(&page.items, cutoff, canonical_prefix, &mut events)
                == ScanControl::ReachedCutoff
            {
                info!("  Reached activities older than cutoff date. Stopping.");
                break None;
            }
            info!("  Checked {} activities...", checked);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break None,
            }
        };

        info!(
            "Activity feed: {} activities checked, {} usable",
            checked,
            events.len()
        );
        (events, failure)
    }
}

impl SubscriptionSource for YouTubeClient {
    async fn list_subscriptions(&self) -> Vec<Subscription> {
        match self.fetch_subscriptions().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                error!("An error occurred while fetching subscriptions: {:#}", e);
                Vec::new()
            }
        }
    }
}

impl ActivitySource for YouTubeClient {
    async fn recent_activity(
        &self,
        cutoff: NaiveDateTime,
        canonical_prefix: &str,
    ) -> Vec<WatchEvent> {
        let (events, failure) = self.fetch_activity(cutoff, canonical_prefix).await;
        if let Some(e) = failure {
            warn!("An error occurred while fetching the activity feed: {:#}", e);
        }
        events
    }
}

impl HandleLookup for YouTubeClient {
    async fn resolve(&self, handles: &BTreeSet<String>) -> HashMap<String, String> {
        let mut resolved = HashMap::new();
        for handle in handles {
            match self.channel_id_for_handle(handle).await {
                Ok(Some(id)) => {
                    debug!("Resolved {} -> {}", handle, id);
                    resolved.insert(handle.clone(), id);
                }
                Ok(None) => debug!("No channel found for {}", handle),
                Err(e) => warn!("Failed to resolve {}: {:#}", handle, e),
            }
        }
        info!("Resolved {} of {} handles", resolved.len(), handles.len());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn cutoff() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn items(value: serde_json::Value) -> Vec<ActivityItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_scan_stops_at_first_old_item() {
        let page = items(json!([
            { "snippet": { "publishedAt": "2024-03-01T00:00:00Z", "channelId": "UC1",
                           "resourceId": { "kind": "youtube#video" } } },
            { "snippet": { "publishedAt": "2023-12-01T00:00:00Z", "channelId": "UC2",
                           "resourceId": { "kind": "youtube#video" } } },
            { "snippet": { "publishedAt": "2024-02-01T00:00:00Z", "channelId": "UC3",
                           "resourceId": { "kind": "youtube#video" } } }
        ]));
        let mut events = Vec::new();
        let control = scan_activity_page(&page, cutoff(), "UC", &mut events);

        assert_eq!(control, ScanControl::ReachedCutoff);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, ChannelKey::canonical("UC1"));
    }

    #[test]
    fn test_api_error_description() {
        let body = r#"{"error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota."}}"#;
        assert_eq!(
            describe_api_error(reqwest::StatusCode::FORBIDDEN, "subscriptions", body),
            "YouTube API error 403 on subscriptions: The request cannot be completed because you have exceeded your quota."
        );
        assert_eq!(
            describe_api_error(reqwest::StatusCode::BAD_GATEWAY, "activities", "upstream down"),
            "YouTube API error (502 Bad Gateway) on activities: upstream down"
        );
    }

    #[test]
    fn test_scan_passes_over_unusable_items() {
        let page = items(json!([
            { "snippet": { "channelId": "UCnotime", "resourceId": { "kind": "youtube#video" } } },
            { "snippet": { "publishedAt": "2024-03-01T00:00:00Z", "channelId": "UCself" } },
            { "snippet": { "publishedAt": "2024-02-01T00:00:00Z" },
              "contentDetails": { "playlistItem": { "resourceId": { "channelId": "UC7" } } } }
        ]));
        let mut events = Vec::new();
        let control = scan_activity_page(&page, cutoff(), "UC", &mut events);

        assert_eq!(control, ScanControl::Continue);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, ChannelKey::canonical("UC7"));
    }
}
