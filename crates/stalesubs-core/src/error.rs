use std::path::PathBuf;

/// Errors that end a run.
///
/// Failures with a degraded fallback (a bad history record, a failed
/// subscription listing, an unresolved handle) never become an `AuditError`.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("{what} not found: {}\n{remediation}", .path.display())]
    MissingInput {
        what: &'static str,
        path: PathBuf,
        remediation: String,
    },

    #[error("{} is not valid JSON: {source}", .path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AuditError {
    /// True for errors the user can fix by supplying a file or finishing setup
    pub fn is_user_actionable(&self) -> bool {
        matches!(self, AuditError::MissingInput { .. } | AuditError::Auth(_))
    }
}
