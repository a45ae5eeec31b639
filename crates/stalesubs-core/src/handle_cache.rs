use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for handle cache persistence
#[derive(Debug, thiserror::Error)]
pub enum HandleCacheError {
    #[error("Failed to read handle cache: {0}")]
    Read(String),
    #[error("Failed to parse handle cache: {0}")]
    Parse(String),
    #[error("Failed to save handle cache: {0}")]
    Write(String),
}

/// Handle -> canonical channel ID resolutions, persisted to a JSON file so
/// later runs skip the API for handles already seen.
pub struct HandleCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl HandleCache {
    /// Load the cache, starting empty if the file is missing or unreadable.
    /// A damaged file is logged and will be overwritten on the next save.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match Self::load_from_file(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{}; starting with an empty cache", e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    fn load_from_file(path: &Path) -> Result<BTreeMap<String, String>, HandleCacheError> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| HandleCacheError::Parse(e.to_string())),
            // No cache yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(HandleCacheError::Read(e.to_string())),
        }
    }

    pub fn get(&self, handle: &str) -> Option<&str> {
        self.entries.get(handle).map(String::as_str)
    }

    pub fn insert(&mut self, handle: String, channel_id: String) {
        if self.entries.get(&handle) != Some(&channel_id) {
            self.entries.insert(handle, channel_id);
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache back if anything changed since it was opened
    pub fn save(&mut self) -> Result<(), HandleCacheError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| HandleCacheError::Write(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| HandleCacheError::Write(e.to_string()))?;
        self.dirty = false;
        Ok(())
    }
}
