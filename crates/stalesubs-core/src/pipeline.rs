use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tracing::info;

use crate::classify::classify;
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::export::read_records;
use crate::history::{reduce, HistoryIngestor, IngestStats};
use crate::models::{Classification, Subscription, WatchEvent};
use crate::resolve::{resolve_handles, HandleLookup, ResolveStats};

/// Lists the account's current subscriptions.
///
/// Failures are logged by the implementation and surface as an empty list.
#[allow(async_fn_in_trait)]
pub trait SubscriptionSource {
    async fn list_subscriptions(&self) -> Vec<Subscription>;
}

/// A reverse-chronological feed of recent account activity
#[allow(async_fn_in_trait)]
pub trait ActivitySource {
    async fn recent_activity(
        &self,
        cutoff: NaiveDateTime,
        canonical_prefix: &str,
    ) -> Vec<WatchEvent>;
}

/// Everything the report sink needs from one run
#[derive(Debug, Clone)]
pub struct Report {
    pub classification: Classification,
    pub total: usize,
    /// Local time the run started
    pub generated_at: NaiveDateTime,
    /// UTC boundary used for classification
    pub cutoff: NaiveDateTime,
    pub lookback_days: u32,
    pub ingest: IngestStats,
    pub activity_events: usize,
    pub resolve: ResolveStats,
    /// Distinct channels in the resolved history
    pub history_channels: usize,
}

#[derive(Debug)]
pub enum Outcome {
    /// The account has no subscriptions, or they could not be listed
    NoSubscriptions,
    Completed(Report),
}

/// Run the whole audit once.
///
/// The export is read first so that a missing or malformed file aborts before
/// any remote call.
pub async fn run<S, L>(
    config: &AuditConfig,
    now: DateTime<Utc>,
    sources: &S,
    lookup: &L,
) -> Result<Outcome, AuditError>
where
    S: SubscriptionSource + ActivitySource,
    L: HandleLookup,
{
    let cutoff = config.cutoff(now.naive_utc());
    let window_start = config.history_window_start(now.naive_utc());
    let prefix = config.canonical_id_prefix.as_str();

    let records = read_records(&config.export_path)?;

    let subscriptions = sources.list_subscriptions().await;
    if subscriptions.is_empty() {
        return Ok(Outcome::NoSubscriptions);
    }

    let activity = if config.include_activity_feed {
        sources.recent_activity(cutoff, prefix).await
    } else {
        Vec::new()
    };
    let activity_events = activity.len();

    match window_start {
        Some(start) => info!(
            "Reading watch history (looking back to {})...",
            start.format("%Y-%m-%d")
        ),
        None => info!("Reading watch history..."),
    }
    let mut ingestor = HistoryIngestor::new(records, window_start, prefix);
    let index = reduce(ingestor.by_ref().chain(activity));
    let ingest = ingestor.stats();
    info!(
        "History: {} records, {} used, {} outside the window, {} skipped; {} channels",
        ingest.records,
        ingest.accepted,
        ingest.too_old,
        ingest.skipped,
        index.len()
    );

    let (index, resolve) = resolve_handles(index, lookup, prefix).await;
    if resolve.unresolved > 0 {
        info!(
            "{} handles could not be resolved and will not match any subscription",
            resolve.unresolved
        );
    }

    let classification = classify(&subscriptions, &index, cutoff);

    Ok(Outcome::Completed(Report {
        total: subscriptions.len(),
        classification,
        generated_at: now.with_timezone(&Local).naive_local(),
        cutoff,
        lookback_days: config.lookback_days,
        ingest,
        activity_events,
        resolve,
        history_channels: index.len(),
    }))
}
