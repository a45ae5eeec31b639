use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::parse_timestamp;
use crate::models::{ChannelKey, WatchEvent};

/// One entry of a watch-history export.
///
/// Every field is optional; a record missing what the ingestor needs is
/// dropped rather than failing the whole export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// When the video was watched
    #[serde(default)]
    pub time: Option<String>,
    /// Attribution: the channel that published the video
    #[serde(default)]
    pub subtitles: Option<Vec<RecordAttribution>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordAttribution {
    #[serde(default)]
    pub url: Option<String>,
}

impl HistoryRecord {
    /// Decode a loosely-typed export entry; `None` if it is not record-shaped
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn watched_at(&self) -> Option<NaiveDateTime> {
        self.time.as_deref().and_then(parse_timestamp)
    }

    /// Channel of the first attribution that carries a URL
    pub fn channel(&self, canonical_prefix: &str) -> Option<ChannelKey> {
        let url = self
            .subtitles
            .as_deref()?
            .iter()
            .find_map(|a| a.url.as_deref().filter(|u| !u.trim().is_empty()))?;
        ChannelKey::from_channel_url(url, canonical_prefix)
    }
}

/// Counters describing one pass over an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records seen
    pub records: usize,
    /// Records that became a WatchEvent
    pub accepted: usize,
    /// Records without a usable timestamp or channel
    pub skipped: usize,
    /// Records older than the window start
    pub too_old: usize,
}

enum SkipReason {
    Undecodable,
    NoTimestamp,
    BeforeWindow,
    NoChannel,
}

/// Lazily turns raw export records into WatchEvents inside the history window.
///
/// The export is not assumed to be sorted, so every record is examined; there
/// is no early exit at the first old entry. With no window start every dated
/// record is kept.
pub struct HistoryIngestor<I> {
    records: I,
    window_start: Option<NaiveDateTime>,
    canonical_prefix: String,
    stats: IngestStats,
}

impl<I> HistoryIngestor<I>
where
    I: Iterator<Item = Value>,
{
    pub fn new<R>(
        records: R,
        window_start: Option<NaiveDateTime>,
        canonical_prefix: &str,
    ) -> Self
    where
        R: IntoIterator<IntoIter = I, Item = Value>,
    {
        Self {
            records: records.into_iter(),
            window_start,
            canonical_prefix: canonical_prefix.to_string(),
            stats: IngestStats::default(),
        }
    }

    /// Counters so far; final once the iterator is exhausted
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    fn examine(&self, value: Value) -> Result<WatchEvent, SkipReason> {
        let record = HistoryRecord::from_value(value).ok_or(SkipReason::Undecodable)?;
        let watched_at = record.watched_at().ok_or(SkipReason::NoTimestamp)?;
        if self.window_start.is_some_and(|start| watched_at < start) {
            return Err(SkipReason::BeforeWindow);
        }
        let channel = record
            .channel(&self.canonical_prefix)
            .ok_or(SkipReason::NoChannel)?;
        Ok(WatchEvent::new(channel, watched_at))
    }
}

impl<I> Iterator for HistoryIngestor<I>
where
    I: Iterator<Item = Value>,
{
    type Item = WatchEvent;

    fn next(&mut self) -> Option<WatchEvent> {
        loop {
            let value = self.records.next()?;
            self.stats.records += 1;

            match self.examine(value) {
                Ok(event) => {
                    self.stats.accepted += 1;
                    return Some(event);
                }
                Err(SkipReason::BeforeWindow) => self.stats.too_old += 1,
                Err(reason) => {
                    self.stats.skipped += 1;
                    let why = match reason {
                        SkipReason::Undecodable => "not a history record",
                        SkipReason::NoTimestamp => "missing or unparsable time",
                        _ => "no channel attribution",
                    };
                    debug!(record = self.stats.records, "Skipping history record: {}", why);
                }
            }
        }
    }
}
