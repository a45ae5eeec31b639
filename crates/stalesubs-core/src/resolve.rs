//! Handle resolution: turning `@name` keys into canonical channel IDs and
//! re-merging entries that collapse onto the same channel.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::handle_cache::HandleCache;
use crate::history::HistoryIndex;
use crate::models::ChannelKey;

/// Something that can map handles (`@name`) to canonical channel IDs.
///
/// Handles missing from the returned map are unresolved; that is not an error.
#[allow(async_fn_in_trait)]
pub trait HandleLookup {
    async fn resolve(&self, handles: &BTreeSet<String>) -> HashMap<String, String>;
}

impl<L> HandleLookup for &L
where
    L: HandleLookup + ?Sized,
{
    async fn resolve(&self, handles: &BTreeSet<String>) -> HashMap<String, String> {
        (**self).resolve(handles).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Handle keys found in the index
    pub handles: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Keys that disappeared because they collapsed onto another key
    pub merged: usize,
}

/// Resolve every handle key in `index` with one batched lookup and rebuild it.
pub async fn resolve_handles<L>(
    index: HistoryIndex,
    lookup: &L,
    canonical_prefix: &str,
) -> (HistoryIndex, ResolveStats)
where
    L: HandleLookup,
{
    let handles: BTreeSet<String> = index
        .iter()
        .filter(|(key, _)| key.is_handle())
        .map(|(key, _)| key.as_str().to_string())
        .collect();

    if handles.is_empty() {
        return (index, ResolveStats::default());
    }

    info!("Resolving {} channel handles...", handles.len());
    let resolved = lookup.resolve(&handles).await;
    merge_resolved(index, &resolved, canonical_prefix)
}

/// Rebuild `index` with handles replaced by their canonical IDs, keeping the
/// latest timestamp when several keys land on the same channel.
///
/// A handle whose resolution is missing, or is not itself canonical, stays a
/// handle; it simply will not match any subscription.
pub fn merge_resolved(
    index: HistoryIndex,
    resolved: &HashMap<String, String>,
    canonical_prefix: &str,
) -> (HistoryIndex, ResolveStats) {
    let before = index.len();
    let mut stats = ResolveStats::default();
    let mut merged = HistoryIndex::new();

    for (key, at) in index {
        let target = if key.is_handle() {
            stats.handles += 1;
            let canonical = resolved
                .get(key.as_str())
                .and_then(|id| ChannelKey::parse(id, canonical_prefix))
                .filter(|k| !k.is_handle());
            match canonical {
                Some(canonical) => {
                    stats.resolved += 1;
                    canonical
                }
                None => {
                    stats.unresolved += 1;
                    key
                }
            }
        } else {
            key
        };
        merged.record(target, at);
    }

    stats.merged = before - merged.len();
    (merged, stats)
}

/// Answers from a persisted [`HandleCache`] first and only sends misses to
/// the inner lookup. New resolutions are written back once per batch.
pub struct CachedLookup<L> {
    inner: L,
    cache: Mutex<HandleCache>,
}

impl<L> CachedLookup<L> {
    pub fn new(inner: L, cache: HandleCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    pub fn into_cache(self) -> HandleCache {
        self.cache
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<L> HandleLookup for CachedLookup<L>
where
    L: HandleLookup,
{
    async fn resolve(&self, handles: &BTreeSet<String>) -> HashMap<String, String> {
        let mut found = HashMap::new();
        let mut misses = BTreeSet::new();
        {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            for handle in handles {
                match cache.get(handle) {
                    Some(id) => {
                        found.insert(handle.clone(), id.to_string());
                    }
                    None => {
                        misses.insert(handle.clone());
                    }
                }
            }
        }

        if misses.is_empty() {
            return found;
        }
        info!(
            "{} handles answered from cache, looking up {}",
            found.len(),
            misses.len()
        );

        let fresh = self.inner.resolve(&misses).await;

        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        for (handle, id) in &fresh {
            cache.insert(handle.clone(), id.clone());
        }
        if let Err(e) = cache.save() {
            warn!("{}", e);
        }
        drop(cache);

        found.extend(fresh);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::reduce;
    use crate::models::WatchEvent;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn ev(key: &str, d: u32) -> WatchEvent {
        WatchEvent::new(ChannelKey::parse(key, "UC").unwrap(), day(d))
    }

    /// In-memory lookup that counts how many handles it was asked about
    struct FakeLookup {
        table: HashMap<String, String>,
        asked: AtomicUsize,
    }

    impl FakeLookup {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                table: pairs
                    .iter()
                    .map(|(h, id)| (h.to_string(), id.to_string()))
                    .collect(),
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl HandleLookup for FakeLookup {
        async fn resolve(&self, handles: &BTreeSet<String>) -> HashMap<String, String> {
            self.asked.fetch_add(handles.len(), Ordering::SeqCst);
            handles
                .iter()
                .filter_map(|h| self.table.get(h).map(|id| (h.clone(), id.clone())))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_handle_collapses_onto_canonical_with_max() {
        let index = reduce(vec![ev("UC9", 2), ev("@creator", 5), ev("@other", 1)]);
        let lookup = FakeLookup::new(&[("@creator", "UC9")]);

        let (resolved, stats) = resolve_handles(index, &lookup, "UC").await;

        assert_eq!(resolved.last_seen(&ChannelKey::canonical("UC9")), Some(day(5)));
        // Unresolved handle is kept as-is
        assert_eq!(
            resolved.last_seen(&ChannelKey::handle("other").unwrap()),
            Some(day(1))
        );
        assert_eq!(
            stats,
            ResolveStats {
                handles: 2,
                resolved: 1,
                unresolved: 1,
                merged: 1,
            }
        );
    }

    #[test]
    fn test_merge_never_decreases_recency() {
        let index = reduce(vec![ev("UC1", 20), ev("@old", 3), ev("@new", 10)]);
        let before: Vec<_> = index.iter().map(|(k, at)| (k.clone(), at)).collect();
        let resolved: HashMap<String, String> = [("@old", "UC1"), ("@new", "UC1")]
            .iter()
            .map(|(h, id)| (h.to_string(), id.to_string()))
            .collect();

        let (merged, _) = merge_resolved(index, &resolved, "UC");

        let canonical = merged.last_seen(&ChannelKey::canonical("UC1")).unwrap();
        assert_eq!(canonical, day(20));
        for (_, at) in before {
            assert!(canonical >= at);
        }
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_non_canonical_resolution_is_ignored() {
        let index = reduce(vec![ev("@weird", 4)]);
        let resolved: HashMap<String, String> =
            [("@weird".to_string(), "not-a-channel-id".to_string())].into();

        let (merged, stats) = merge_resolved(index, &resolved, "UC");
        assert!(merged.last_seen(&ChannelKey::handle("weird").unwrap()).is_some());
        assert_eq!(stats.unresolved, 1);
    }

    #[tokio::test]
    async fn test_no_handles_skips_lookup() {
        let index = reduce(vec![ev("UC1", 1)]);
        let lookup = FakeLookup::new(&[]);
        let (resolved, stats) = resolve_handles(index.clone(), &lookup, "UC").await;
        assert_eq!(resolved, index);
        assert_eq!(stats, ResolveStats::default());
        assert_eq!(lookup.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_lookup_only_asks_for_misses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("handle_cache.json");
        let mut cache = HandleCache::open(&path);
        cache.insert("@cached".to_string(), "UC1".to_string());

        let lookup = CachedLookup::new(FakeLookup::new(&[("@fresh", "UC2")]), cache);
        let handles: BTreeSet<String> = ["@cached", "@fresh", "@unknown"]
            .iter()
            .map(|h| h.to_string())
            .collect();

        let result = lookup.resolve(&handles).await;
        assert_eq!(result.get("@cached").map(String::as_str), Some("UC1"));
        assert_eq!(result.get("@fresh").map(String::as_str), Some("UC2"));
        assert!(!result.contains_key("@unknown"));
        assert_eq!(lookup.inner.asked.load(Ordering::SeqCst), 2);

        // Fresh resolution persisted for the next run
        let cache = lookup.into_cache();
        assert_eq!(cache.get("@fresh"), Some("UC2"));
        assert_eq!(HandleCache::open(&path).get("@fresh"), Some("UC2"));
    }
}
