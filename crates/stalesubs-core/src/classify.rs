use chrono::NaiveDateTime;

use crate::history::HistoryIndex;
use crate::models::{ChannelStatus, Classification, StaleReason, Subscription};

/// Split subscriptions into stale and active against `cutoff`.
///
/// Every subscription lands in exactly one side and input order is kept on
/// both. Only canonical keys are looked up, so an unresolved handle in the
/// index can never match.
pub fn classify(
    subscriptions: &[Subscription],
    index: &HistoryIndex,
    cutoff: NaiveDateTime,
) -> Classification {
    let mut result = Classification::default();

    for sub in subscriptions {
        let last_watched = index.last_seen(&sub.key());
        let reason = match last_watched {
            None => Some(StaleReason::NoActivity),
            Some(at) if at < cutoff => Some(StaleReason::LastWatched(at)),
            Some(_) => None,
        };

        let status = ChannelStatus {
            title: sub.title.clone(),
            channel_id: sub.channel_id.clone(),
            last_watched,
            reason,
        };

        if status.reason.is_some() {
            result.stale.push(status);
        } else {
            result.active.push(status);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelKey;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn cutoff() -> NaiveDateTime {
        now() - Duration::days(365)
    }

    #[test]
    fn test_three_outcomes() {
        let mut index = HistoryIndex::new();
        let recent = now() - Duration::days(10);
        let old = now() - Duration::days(400);
        index.record(ChannelKey::canonical("UC1"), recent);
        index.record(ChannelKey::canonical("UC2"), old);

        let subs = vec![
            Subscription::new("UC1", "Recent"),
            Subscription::new("UC2", "Old"),
            Subscription::new("UC3", "Never"),
        ];
        let result = classify(&subs, &index, cutoff());

        assert_eq!(result.active.len(), 1);
        assert_eq!(result.active[0].channel_id, "UC1");
        assert_eq!(result.active[0].last_watched, Some(recent));
        assert_eq!(result.active[0].reason, None);

        assert_eq!(result.stale.len(), 2);
        assert_eq!(result.stale[0].channel_id, "UC2");
        assert_eq!(result.stale[0].last_watched, Some(old));
        assert_eq!(
            result.stale[0].reason.map(|r| r.to_string()),
            Some(format!("Last watched {}", old.format("%Y-%m-%d")))
        );
        assert_eq!(result.stale[1].channel_id, "UC3");
        assert_eq!(result.stale[1].last_watched, None);
        assert_eq!(
            result.stale[1].reason.map(|r| r.to_string()).as_deref(),
            Some("No viewing activity found")
        );
    }

    #[test]
    fn test_watched_exactly_at_cutoff_is_active() {
        let mut index = HistoryIndex::new();
        index.record(ChannelKey::canonical("UC1"), cutoff());
        let result = classify(&[Subscription::new("UC1", "Edge")], &index, cutoff());
        assert_eq!(result.active.len(), 1);
        assert!(result.stale.is_empty());
    }

    #[test]
    fn test_unresolved_handle_does_not_match() {
        let mut index = HistoryIndex::new();
        index.record(ChannelKey::handle("UC1").unwrap(), now());
        let result = classify(&[Subscription::new("UC1", "Chan")], &index, cutoff());
        assert_eq!(result.stale.len(), 1);
        assert_eq!(result.stale[0].reason, Some(StaleReason::NoActivity));
    }

    #[test]
    fn test_total_and_order_preserving() {
        let mut index = HistoryIndex::new();
        let subs: Vec<Subscription> = (0..20)
            .map(|i| Subscription::new(format!("UC{i}"), format!("Channel {i}")))
            .collect();
        // Even channels watched recently, odd ones never
        for sub in subs.iter().step_by(2) {
            index.record(sub.key(), now());
        }

        let result = classify(&subs, &index, cutoff());
        assert_eq!(result.total(), subs.len());

        let position = |id: &str| subs.iter().position(|s| s.channel_id == id).unwrap();
        for side in [&result.stale, &result.active] {
            let positions: Vec<_> = side.iter().map(|s| position(&s.channel_id)).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
        for sub in &subs {
            let in_stale = result.stale.iter().any(|s| s.channel_id == sub.channel_id);
            let in_active = result.active.iter().any(|s| s.channel_id == sub.channel_id);
            assert!(in_stale ^ in_active);
        }
    }

    #[test]
    fn test_empty_subscriptions() {
        let result = classify(&[], &HistoryIndex::new(), cutoff());
        assert_eq!(result, Classification::default());
    }
}
