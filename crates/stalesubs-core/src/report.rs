//! Plain-text rendering of a finished audit, for the console and for the
//! timestamped report file.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::models::ChannelStatus;
use crate::pipeline::Report;

const RULE_WIDTH: usize = 80;

/// Which flavour of the report to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Summary and stale list
    Console,
    /// Console content plus a generation stamp, run statistics and the active list
    File,
}

/// A [`Report`] paired with the layout it should be displayed in
pub struct Rendered<'a> {
    report: &'a Report,
    layout: Layout,
}

pub fn render(report: &Report, layout: Layout) -> Rendered<'_> {
    Rendered { report, layout }
}

/// `youtube_subscription_analysis_YYYYMMDD_HHMMSS.txt` for the run's local start time
pub fn report_file_name(report: &Report) -> String {
    format!(
        "youtube_subscription_analysis_{}.txt",
        report.generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write the file layout into `dir` and return the path written
pub fn save(report: &Report, dir: &Path) -> Result<PathBuf, AuditError> {
    let path = dir.join(report_file_name(report));
    let contents = render(report, Layout::File).to_string();
    std::fs::write(&path, contents).map_err(|source| AuditError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Report written to {}", path.display());
    Ok(path)
}

/// Wording for the lookback window: ("in the last year", "in over one year")
fn window_phrase(lookback_days: u32) -> (String, String) {
    if lookback_days == 365 {
        ("in the last year".to_string(), "in over one year".to_string())
    } else {
        (
            format!("in the last {} days", lookback_days),
            format!("in over {} days", lookback_days),
        )
    }
}

fn rule(f: &mut fmt::Formatter<'_>, ch: char) -> fmt::Result {
    writeln!(f, "{}", ch.to_string().repeat(RULE_WIDTH))
}

fn write_stale(f: &mut fmt::Formatter<'_>, index: usize, channel: &ChannelStatus) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}. {}", index, channel.title)?;
    writeln!(f, "   Channel ID: {}", channel.channel_id)?;
    if let Some(reason) = channel.reason {
        writeln!(f, "   Status: {}", reason)?;
    }
    writeln!(f, "   URL: {}", channel.url())
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let classification = &report.classification;
        let (recent, over) = window_phrase(report.lookback_days);

        rule(f, '=')?;
        writeln!(f, "YOUTUBE SUBSCRIPTION ANALYSIS RESULTS")?;
        if self.layout == Layout::File {
            writeln!(
                f,
                "Generated: {}",
                report.generated_at.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        rule(f, '=')?;
        writeln!(f)?;

        writeln!(f, "Total Subscriptions: {}", report.total)?;
        writeln!(f, "Watched {}: {}", recent, classification.active.len())?;
        writeln!(f, "NOT watched {}: {}", recent, classification.stale.len())?;

        if self.layout == Layout::File {
            let ingest = &report.ingest;
            writeln!(f)?;
            writeln!(
                f,
                "History records: {} read, {} used, {} outside window, {} skipped",
                ingest.records, ingest.accepted, ingest.too_old, ingest.skipped
            )?;
            writeln!(f, "Activity feed events: {}", report.activity_events)?;
            writeln!(
                f,
                "Handles: {} resolved, {} unresolved",
                report.resolve.resolved, report.resolve.unresolved
            )?;
            writeln!(f, "Channels in history: {}", report.history_channels)?;
        }

        if classification.stale.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Great! You've watched videos from all your subscribed channels {}.",
                recent
            )?;
        } else {
            writeln!(f)?;
            rule(f, '-')?;
            writeln!(f, "CHANNELS NOT WATCHED {}:", over.to_uppercase())?;
            rule(f, '-')?;
            for (i, channel) in classification.stale.iter().enumerate() {
                write_stale(f, i + 1, channel)?;
            }
        }

        if self.layout == Layout::File && !classification.active.is_empty() {
            writeln!(f)?;
            rule(f, '-')?;
            writeln!(f, "CHANNELS WATCHED {}:", recent.to_uppercase())?;
            rule(f, '-')?;
            for (i, channel) in classification.active.iter().enumerate() {
                writeln!(f)?;
                writeln!(f, "{}. {}", i + 1, channel.title)?;
                if let Some(at) = channel.last_watched {
                    writeln!(f, "   Last watched: {}", at.format("%Y-%m-%d"))?;
                }
            }
        }

        writeln!(f)?;
        rule(f, '=')
    }
}
