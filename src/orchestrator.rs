//! Main orchestration logic for downloading the latest dump.

use crate::error::DumpError;
use crate::resolve::resolve_latest;
use crate::store::ObjectStore;
use crate::sync::sync_snapshot;
use crate::types::{DownloadConfig, SyncReport};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Fails unless `dest_folder` exists and is a directory.
///
/// Runs before any request is sent to the bucket.
pub fn validate_dest_folder(dest_folder: &Path) -> Result<(), DumpError> {
    let metadata = match std::fs::metadata(dest_folder) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DumpError::DestinationMissing(dest_folder.to_path_buf()))
        }
        Err(e) => return Err(DumpError::IoError(e)),
    };
    if !metadata.is_dir() {
        return Err(DumpError::DestinationNotDirectory(dest_folder.to_path_buf()));
    }
    Ok(())
}

/// Downloads the latest hotel dump into `dest_folder`.
///
/// This is the main entry point. It performs the following steps:
///
/// 1. Checks that the destination folder exists
/// 2. Lists the namespace and picks the latest snapshot
/// 3. Downloads the missing files of that snapshot, verifying each one
///
/// # Example
///
/// ```no_run
/// use hotel_dump::{download_latest, DownloadConfig, S3Store};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DownloadConfig::default();
/// let store = S3Store::from_env(config.bucket.clone()).await;
/// let report = download_latest(&store, &config, Path::new("/data/dumps")).await?;
/// println!("{} files downloaded", report.downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn download_latest(
    store: &dyn ObjectStore,
    config: &DownloadConfig,
    dest_folder: &Path,
) -> Result<SyncReport, DumpError> {
    validate_dest_folder(dest_folder)?;
    let started = Instant::now();

    let snapshot = resolve_latest(store, config).await?;
    info!("Downloading dump from {}", snapshot);

    let report = sync_snapshot(store, config, &snapshot, dest_folder).await?;

    // Drop sub-second precision from the summary.
    let elapsed = std::time::Duration::from_secs(started.elapsed().as_secs());
    info!(
        "✅ Dump {} synced: {} downloaded ({} bytes), {} already present, took {}",
        report.snapshot,
        report.downloaded,
        report.bytes,
        report.skipped,
        humantime::format_duration(elapsed)
    );
    Ok(report)
}
