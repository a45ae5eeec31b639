use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CANONICAL_ID_PREFIX, DEFAULT_CREDENTIALS_FILE, DEFAULT_EXPORT_FILE, DEFAULT_HANDLE_CACHE_FILE,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_TOKEN_FILE, LOCAL_CONFIG_FILE,
};
use crate::error::AuditError;

/// Run configuration that can be loaded from a JSON file.
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditConfig {
    /// Trailing window, in days, that counts as "recently watched"
    pub lookback_days: u32,

    /// How far back export records are read at all. Unset keeps the whole
    /// export, so stale channels still report when they were last watched.
    pub history_window_days: Option<u32>,

    /// Watch-history export (Takeout `watch-history.json`)
    pub export_path: PathBuf,

    /// Prefix that marks a canonical channel ID
    pub canonical_id_prefix: String,

    /// OAuth client secrets downloaded from the cloud console
    pub credentials_path: PathBuf,

    /// Cached OAuth token
    pub token_path: PathBuf,

    /// Handle -> channel ID resolutions kept between runs
    pub handle_cache_path: PathBuf,

    /// Directory the timestamped report file is written to
    pub report_dir: PathBuf,

    /// Also scan the account's activity feed for watch evidence
    pub include_activity_feed: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            history_window_days: None,
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            canonical_id_prefix: CANONICAL_ID_PREFIX.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            handle_cache_path: PathBuf::from(DEFAULT_HANDLE_CACHE_FILE),
            report_dir: PathBuf::from("."),
            include_activity_feed: true,
        }
    }
}

impl AuditConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| AuditError::MalformedInput {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config for this run.
    ///
    /// An explicit path must exist. Otherwise `./stalesubs.json` and then
    /// `<config_dir>/stalesubs/config.json` are tried, falling back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, AuditError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(AuditError::MissingInput {
                    what: "config file",
                    path: path.to_path_buf(),
                    remediation: "Check the --config path or omit it to use defaults.".to_string(),
                });
            }
            return Self::load(path);
        }

        let candidates = std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE))
            .chain(dirs::config_dir().map(|dir| dir.join("stalesubs").join("config.json")));

        for candidate in candidates {
            if candidate.exists() {
                tracing::debug!("Loading config from {}", candidate.display());
                return Self::load(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// The boundary between "recently watched" and "stale"
    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        days_before(now, self.lookback_days)
    }

    /// Oldest export record worth reading, if the history window is bounded
    pub fn history_window_start(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.history_window_days.map(|days| days_before(now, days))
    }
}

/// `now` minus `days`, pinned to the earliest representable time when the
/// window reaches past it
fn days_before(now: NaiveDateTime, days: u32) -> NaiveDateTime {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(NaiveDateTime::MIN)
}
