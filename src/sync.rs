//! File synchronization for one snapshot.

use crate::error::DumpError;
use crate::store::{ObjectStore, StoreError};
use crate::types::{DownloadConfig, ObjectEntry, SnapshotId, SyncReport};
use crate::verify::verify_download;
use std::path::{Path, PathBuf};
use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, warn};

/// Suffix of the file a download is written to before it is verified.
const TMP_SUFFIX: &str = "_tmp";

/// What happened to a single listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Skipped,
    Downloaded(u64),
}

/// Local folder of a snapshot: `<dest>/<namespace>/<snapshot>`.
pub fn local_snapshot_dir(
    dest_folder: &Path,
    config: &DownloadConfig,
    snapshot: &SnapshotId,
) -> PathBuf {
    dest_folder.join(&config.namespace).join(snapshot.as_str())
}

fn temp_path(local_dir: &Path, basename: &str) -> PathBuf {
    local_dir.join(format!("{}{}", basename, TMP_SUFFIX))
}

/// Whether a listed entry is a data file to mirror locally.
fn is_data_file(entry: &ObjectEntry, marker: &str) -> bool {
    let basename = entry.basename();
    !basename.is_empty() && basename != marker
}

fn progress_bar(len: usize, visible: bool) -> indicatif::ProgressBar {
    if !visible {
        return indicatif::ProgressBar::hidden();
    }
    let pb = indicatif::ProgressBar::new(len as u64);
    let style = indicatif::ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg} | {elapsed_precise} elapsed")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb
}

/// Downloads `key` to `dest`, retrying transfer errors as configured.
async fn download_with_retry(
    store: &dyn ObjectStore,
    config: &DownloadConfig,
    key: &str,
    dest: &Path,
) -> Result<u64, StoreError> {
    let retry_strategy = FixedInterval::from_millis(config.retry_interval_ms).take(config.retries);

    Retry::spawn(retry_strategy, || async move {
        match store.download(key, dest).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                warn!("Failed to download {} due to error: {}", key, e);
                RetryError::to_transient(e)
            }
        }
    })
    .await
}

/// Brings one listed file to its final local name.
///
/// An existing final file is trusted as is. Otherwise the object goes to
/// `<basename>_tmp`, is verified, and is renamed into place. On any error the
/// temp file stays on disk.
async fn sync_file(
    store: &dyn ObjectStore,
    config: &DownloadConfig,
    entry: &ObjectEntry,
    local_dir: &Path,
) -> Result<FileOutcome, DumpError> {
    let basename = entry.basename();
    let local_path = local_dir.join(basename);

    if tokio::fs::try_exists(&local_path).await? {
        debug!("- Skipping {}, already downloaded", entry.key);
        return Ok(FileOutcome::Skipped);
    }

    debug!("- Downloading {}", entry.key);
    let tmp_path = temp_path(local_dir, basename);
    let bytes = download_with_retry(store, config, &entry.key, &tmp_path).await?;

    verify_download(&entry.key, &tmp_path, entry.e_tag.as_deref()).await?;

    tokio::fs::rename(&tmp_path, &local_path).await?;
    Ok(FileOutcome::Downloaded(bytes))
}

/// Downloads every missing file of `snapshot` into `<dest>/<namespace>/<snapshot>/`.
///
/// Files already present under their final name are skipped, so re-running
/// after a failure resumes where the previous run stopped.
///
/// # Arguments
///
/// * `store` - Bucket to read from
/// * `config` - Download configuration
/// * `snapshot` - Snapshot returned by the resolver
/// * `dest_folder` - Root of the local dump tree
///
/// # Returns
///
/// Counts of downloaded and skipped files, or the first error encountered.
pub async fn sync_snapshot(
    store: &dyn ObjectStore,
    config: &DownloadConfig,
    snapshot: &SnapshotId,
    dest_folder: &Path,
) -> Result<SyncReport, DumpError> {
    let local_dir = local_snapshot_dir(dest_folder, config, snapshot);
    tokio::fs::create_dir_all(&local_dir).await?;

    let prefix = format!("{}/{}/", config.namespace, snapshot);
    let entries = store.list(&prefix).await?;
    let files: Vec<&ObjectEntry> = entries
        .iter()
        .filter(|entry| is_data_file(entry, &config.marker))
        .collect();

    info!(
        "📦 Dump {} has {} files, syncing into {}",
        snapshot,
        files.len(),
        local_dir.display()
    );

    let pb = progress_bar(files.len(), config.show_progress);
    let mut report = SyncReport {
        snapshot: snapshot.clone(),
        local_dir: local_dir.clone(),
        downloaded: 0,
        skipped: 0,
        bytes: 0,
    };

    for entry in files {
        pb.set_message(format!("| ⬇️  {}", entry.basename()));
        match sync_file(store, config, entry, &local_dir).await {
            Ok(FileOutcome::Skipped) => report.skipped += 1,
            Ok(FileOutcome::Downloaded(bytes)) => {
                report.downloaded += 1;
                report.bytes += bytes;
            }
            Err(e) => {
                pb.abandon_with_message("❌ Download failed!");
                return Err(e);
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "✅ {} downloaded, {} already present",
        report.downloaded, report.skipped
    ));
    Ok(report)
}
