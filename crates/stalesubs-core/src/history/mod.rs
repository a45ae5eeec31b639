//! Watch history: decoding export records, filtering them to the history
//! window and folding them into a per-channel "last seen" index.

mod index;
mod ingest;
mod timestamp;

pub use index::{reduce, HistoryIndex};
pub use ingest::{HistoryIngestor, HistoryRecord, IngestStats, RecordAttribution};
pub use timestamp::parse_timestamp;
