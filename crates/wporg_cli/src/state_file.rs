//! JSON state file holding per-endpoint bookmarks.
//!
//! Layout:
//!
//! ```json
//! {"bookmarks": {"plugins": {"replication_key": "last_updated",
//!                            "replication_key_value": "2024-06-01 12:00:00"}}}
//! ```
//!
//! Every watermark update rewrites the whole file through a temporary file
//! in the same directory followed by a rename.

use crate::error::CliError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use wporg_sync_engine::{registry, SyncError, SyncResult, WatermarkStore};

/// One endpoint's bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Field the value was taken from.
    #[serde(default)]
    pub replication_key: Option<String>,
    /// The watermark.
    pub replication_key_value: String,
}

/// The whole state document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Bookmarks by endpoint name.
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
}

/// A [`WatermarkStore`] backed by a JSON file.
///
/// Without a path the state lives in memory only and is reported through
/// the final `STATE` message.
#[derive(Debug)]
pub struct JsonStateFile {
    path: Option<PathBuf>,
    document: Mutex<StateDocument>,
}

impl JsonStateFile {
    /// Opens `path`, treating a missing file as empty state.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let document = match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => StateDocument::default(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| CliError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
            Err(source) => {
                return Err(CliError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            document: Mutex::new(document),
        })
    }

    /// Creates an unpersisted state.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(StateDocument::default()),
        }
    }

    #[cfg(test)]
    fn document(&self) -> StateDocument {
        self.document.lock().clone()
    }

    /// Returns the current state as JSON.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&*self.document.lock()).unwrap_or(Value::Null)
    }

    fn save(&self, document: &StateDocument) -> SyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let fail = |what: &str, e: &dyn std::fmt::Display| {
            SyncError::State(format!("{}: {}: {}", path.display(), what, e))
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail("create", &e))?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), document)
            .map_err(|e| fail("serialize", &e))?;
        tmp.write_all(b"\n").map_err(|e| fail("write", &e))?;
        tmp.as_file().sync_all().map_err(|e| fail("sync", &e))?;
        tmp.persist(path).map_err(|e| fail("rename", &e.error))?;

        debug!(path = %path.display(), "state file written");
        Ok(())
    }
}

impl WatermarkStore for JsonStateFile {
    fn get(&self, endpoint: &str) -> SyncResult<Option<String>> {
        Ok(self
            .document
            .lock()
            .bookmarks
            .get(endpoint)
            .map(|b| b.replication_key_value.clone()))
    }

    fn set(&self, endpoint: &str, value: &str) -> SyncResult<()> {
        let mut document = self.document.lock();
        let mut next = document.clone();
        next.bookmarks.insert(
            endpoint.to_string(),
            Bookmark {
                replication_key: registry::find(endpoint)
                    .and_then(|d| d.replication_key)
                    .map(str::to_string),
                replication_key_value: value.to_string(),
            },
        );
        self.save(&next)?;
        *document = next;
        Ok(())
    }
}
