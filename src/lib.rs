//! hotel-dump - Download the latest complete hotel dump from S3
//!
//! This library locates the most recent snapshot of the hotel dataset in the
//! `trustyou-api` bucket and mirrors its files into a local folder, checking
//! every download against the MD5 e-tag reported by S3.
//!
//! # Features
//!
//! - **Latest Snapshot Selection**: Picks the greatest snapshot folder name
//! - **MD5 Verification**: Compares each download against its listed e-tag
//! - **Resumable Runs**: Files already present locally are skipped
//! - **Atomic Placement**: Downloads land under a `_tmp` name and are renamed once verified
//!
//! # Example
//!
//! ```no_run
//! use hotel_dump::{download_latest, DownloadConfig, S3Store};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloadConfig::default();
//! let store = S3Store::from_env(config.bucket.clone()).await;
//!
//! download_latest(&store, &config, Path::new("dumps")).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;
mod orchestrator;
mod resolve;
mod store;
mod sync;
mod types;
mod verify;

pub use error::DumpError;
pub use logging::LogConfig;
pub use orchestrator::{download_latest, validate_dest_folder};
pub use resolve::resolve_latest;
pub use store::{ObjectStore, S3Store, StoreError};
pub use sync::{local_snapshot_dir, sync_snapshot};
pub use types::{
    DownloadConfig, ObjectEntry, SelectionPolicy, SnapshotId, SyncReport, DEFAULT_BUCKET,
    DEFAULT_NAMESPACE, DONE_MARKER,
};
pub use verify::{compute_file_md5, quoted_etag, verify_download};
