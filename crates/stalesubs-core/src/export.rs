use std::path::Path;

use serde_json::Value;

use crate::error::AuditError;

const EXPORT_REMEDIATION: &str = "Export your watch history from Google Takeout \
(YouTube and YouTube Music > history, JSON format) and place watch-history.json \
in the working directory, or point exportPath / --export at it.";

fn missing_export(path: &Path) -> AuditError {
    AuditError::MissingInput {
        what: "Watch-history export",
        path: path.to_path_buf(),
        remediation: EXPORT_REMEDIATION.to_string(),
    }
}

/// Fail early, before any interactive authorization, when the export is absent
pub fn ensure_present(path: &Path) -> Result<(), AuditError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(missing_export(path))
    }
}

/// Read every entry of a watch-history export.
///
/// Entries are returned loosely typed; per-record validation happens in the
/// ingestor. Only a missing file or a file that is not a JSON array fails.
pub fn read_records(path: &Path) -> Result<Vec<Value>, AuditError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(missing_export(path));
        }
        Err(source) => {
            return Err(AuditError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let records: Vec<Value> =
        serde_json::from_str(&content).map_err(|source| AuditError::MalformedInput {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}
