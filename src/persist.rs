//! Debounced JSON persistence for the workspace layout.
//!
//! Layout changes arrive in bursts (a divider drag fires on every pointer
//! move), so writes go through a single-slot debounce: only the latest
//! record is kept and flushed once the quiet period elapses. Loading is
//! forgiving: any unreadable, malformed, or wrong-version file falls back
//! to the built-in default arrangement.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::tree::{LayoutNode, WindowKey, is_valid_layout};

pub const SCHEMA_VERSION: u32 = 1;
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Versioned on-disk snapshot of the layout tree. Field names stay
/// camelCase so records interchange with the dashboard's JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub version: u32,
    /// Milliseconds since the Unix epoch at capture time.
    pub updated_at: u64,
    pub layout: LayoutNode,
    pub open_windows: Vec<WindowKey>,
}

impl LayoutRecord {
    pub fn capture(layout: &LayoutNode) -> Self {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self {
            version: SCHEMA_VERSION,
            updated_at,
            layout: layout.clone(),
            open_windows: layout.collect_window_keys().into_iter().collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read layout file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write layout file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed layout record")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported layout schema version {found}, expected {SCHEMA_VERSION}")]
    Version { found: u32 },
    #[error("layout record failed structural validation")]
    Invalid,
}

/// Parse and vet a serialized record. Rejects wrong schema versions and
/// structurally invalid trees (excessive depth, duplicate windows or ids,
/// non-finite ratios).
pub fn decode_record(json: &str) -> Result<LayoutRecord, StoreError> {
    let record: LayoutRecord = serde_json::from_str(json)?;
    if record.version != SCHEMA_VERSION {
        return Err(StoreError::Version {
            found: record.version,
        });
    }
    if !is_valid_layout(&record.layout) {
        return Err(StoreError::Invalid);
    }
    Ok(record)
}

/// File-backed layout store with a 200ms write debounce.
///
/// Not self-clocking: the owner calls `tick` from its event loop and
/// `flush` on shutdown.
pub struct LayoutStore {
    path: PathBuf,
    pending: Option<(Instant, LayoutRecord)>,
}

impl LayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Read the persisted layout, or `None` when the file is absent or the
    /// record does not pass `decode_record`. Every failure mode degrades to
    /// the default layout rather than surfacing an error to the caller.
    pub fn load(&self) -> Option<LayoutRecord> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "layout file unreadable");
                return None;
            }
        };
        match decode_record(&json) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "discarding persisted layout");
                None
            }
        }
    }

    /// Queue `record` for writing. An already queued record is replaced and
    /// the quiet period restarts from `now`.
    pub fn schedule(&mut self, record: LayoutRecord, now: Instant) {
        self.pending = Some((now + SAVE_DEBOUNCE, record));
    }

    /// Write the queued record if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Result<(), StoreError> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.flush(),
            _ => Ok(()),
        }
    }

    /// Write the queued record immediately, debounce notwithstanding.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let Some((_, record)) = self.pending.take() else {
            return Ok(());
        };
        self.write_record(&record)
    }

    fn write_record(&self, record: &LayoutRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "layout persisted");
        Ok(())
    }
}
