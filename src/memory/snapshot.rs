//! On-disk snapshot of a conversation memory
//!
//! A snapshot is a single JSON document:
//!
//! ```text
//! {
//!   "history": [ {"role": "human", "content": "...", "timestamp": "2024-03-15 14:30:05"} ],
//!   "max_messages": 20,
//!   "saved_at": "2024-03-15T14:30:07.123+01:00"
//! }
//! ```
//!
//! Writes serialize the whole document first and hand it to the filesystem in
//! one call. Reads classify faults into "missing", "malformed" and plain I/O.

use super::entry::Entry;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::ErrorKind;
use std::path::Path;

/// Capacity assumed when a snapshot does not record one.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 20;

fn default_capacity() -> usize {
    DEFAULT_SNAPSHOT_CAPACITY
}

/// Serialized memory state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub history: Vec<Entry>,
    #[serde(default = "default_capacity")]
    pub max_messages: usize,
    /// Informational only. Offset-less values are read as local time and
    /// unreadable ones are dropped rather than failing the load.
    #[serde(
        default,
        deserialize_with = "lenient_saved_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub saved_at: Option<DateTime<FixedOffset>>,
}

fn lenient_saved_at<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_saved_at))
}

/// RFC 3339, or an ISO-8601 local time without offset.
fn parse_saved_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(DateTime::<FixedOffset>::from)
}

impl Snapshot {
    /// Capture entries and capacity, stamped with the current time.
    pub fn capture<'a>(entries: impl IntoIterator<Item = &'a Entry>, capacity: usize) -> Self {
        Self {
            history: entries.into_iter().cloned().collect(),
            max_messages: capacity,
            saved_at: Some(Local::now().into()),
        }
    }

    /// Parse a snapshot document. `path` is only used for error reporting.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| Error::SnapshotFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if snapshot.max_messages == 0 {
            return Err(Error::SnapshotFormat {
                path: path.to_path_buf(),
                reason: "max_messages must be greater than zero".to_string(),
            });
        }

        Ok(snapshot)
    }

    /// Read and parse a snapshot file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::SnapshotNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Self::parse(&bytes, path)
    }

    /// Serialize and write the snapshot, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, body)?;
        Ok(())
    }

    /// [`Snapshot::write`] for async callers.
    pub async fn write_async(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}
