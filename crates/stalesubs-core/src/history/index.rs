use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{ChannelKey, WatchEvent};

/// Latest watch time per channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryIndex {
    last_seen: HashMap<ChannelKey, NaiveDateTime>,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `at` if the key is new or `at` is strictly later than what is stored
    pub fn record(&mut self, key: ChannelKey, at: NaiveDateTime) {
        self.last_seen
            .entry(key)
            .and_modify(|stored| {
                if at > *stored {
                    *stored = at;
                }
            })
            .or_insert(at);
    }

    pub fn last_seen(&self, key: &ChannelKey) -> Option<NaiveDateTime> {
        self.last_seen.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelKey, NaiveDateTime)> {
        self.last_seen.iter().map(|(k, v)| (k, *v))
    }

    /// Number of keys still in handle form
    pub fn handle_count(&self) -> usize {
        self.last_seen.keys().filter(|k| k.is_handle()).count()
    }

    /// Re-express the index as one event per key
    pub fn events(&self) -> impl Iterator<Item = WatchEvent> + '_ {
        self.iter().map(|(key, at)| WatchEvent::new(key.clone(), at))
    }
}

impl IntoIterator for HistoryIndex {
    type Item = (ChannelKey, NaiveDateTime);
    type IntoIter = std::collections::hash_map::IntoIter<ChannelKey, NaiveDateTime>;

    fn into_iter(self) -> Self::IntoIter {
        self.last_seen.into_iter()
    }
}

impl FromIterator<WatchEvent> for HistoryIndex {
    fn from_iter<T: IntoIterator<Item = WatchEvent>>(iter: T) -> Self {
        reduce(iter)
    }
}

/// Fold events into a HistoryIndex (max timestamp per key).
/// The result depends only on the set of events, not their order.
pub fn reduce<I>(events: I) -> HistoryIndex
where
    I: IntoIterator<Item = WatchEvent>,
{
    events.into_iter().fold(HistoryIndex::new(), |mut index, event| {
        index.record(event.channel, event.watched_at);
        index
    })
}
