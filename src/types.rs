//! Data structures for dump download operations.

use std::fmt;
use std::path::PathBuf;

/// Bucket holding the dumps of the TrustYou API.
pub const DEFAULT_BUCKET: &str = "trustyou-api";

/// Top-level folder of the hotel dumps inside the bucket.
pub const DEFAULT_NAMESPACE: &str = "hotels";

/// Zero-byte object written last into a snapshot folder.
pub const DONE_MARKER: &str = "done";

/// How the resolver decides which snapshot is the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Greatest snapshot name, whether or not its `done` marker exists.
    #[default]
    LatestName,
    /// Greatest snapshot name whose `done` marker is present in the listing.
    RequireDoneMarker,
}

/// Configuration for downloading dumps.
///
/// # Example
///
/// ```
/// use hotel_dump::{DownloadConfig, SelectionPolicy};
///
/// let config = DownloadConfig {
///     selection: SelectionPolicy::RequireDoneMarker,
///     retries: 2,
///     ..DownloadConfig::default()
/// };
/// assert_eq!(config.bucket, "trustyou-api");
/// ```
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Bucket to read from.
    pub bucket: String,
    /// Folder inside the bucket containing one sub-folder per snapshot (e.g. `"hotels"`).
    pub namespace: String,
    /// Basename of the completion marker object.
    pub marker: String,
    /// Snapshot selection rule.
    pub selection: SelectionPolicy,
    /// Extra attempts per file on transfer errors (default: 0).
    ///
    /// Integrity failures are never retried.
    pub retries: usize,
    /// Delay between transfer retries, in milliseconds.
    pub retry_interval_ms: u64,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            marker: DONE_MARKER.to_string(),
            selection: SelectionPolicy::default(),
            retries: 0,
            retry_interval_ms: 10_000,
            show_progress: false,
        }
    }
}

/// One object returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key, e.g. `hotels/20230101/rooms.json`.
    pub key: String,
    /// E-tag as returned by the service, surrounding quotes included.
    pub e_tag: Option<String>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, e_tag: Option<String>) -> Self {
        Self {
            key: key.into(),
            e_tag,
        }
    }

    /// Final `/`-separated segment of the key.
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Label of a snapshot folder, ordered by plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a completed synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Snapshot that was synchronized.
    pub snapshot: SnapshotId,
    /// Local folder holding the snapshot files.
    pub local_dir: PathBuf,
    /// Files downloaded and verified during this run.
    pub downloaded: usize,
    /// Files skipped because they were already present.
    pub skipped: usize,
    /// Bytes written for the downloaded files.
    pub bytes: u64,
}
