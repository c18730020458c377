//! Error types for dump download operations.

use crate::store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, downloading or verifying a dump.
///
/// Every variant is fatal for the run. Re-running the program resumes from
/// the files already finalized on disk.
#[derive(Error, Debug)]
pub enum DumpError {
    /// The destination folder does not exist.
    #[error("Destination folder does not exist: {}", .0.display())]
    DestinationMissing(PathBuf),

    /// The destination path exists but is not a directory.
    #[error("Destination is not a directory: {}", .0.display())]
    DestinationNotDirectory(PathBuf),

    /// No snapshot under the namespace qualified for download.
    #[error("No complete dump folder found under '{prefix}'")]
    NoDumpAvailable { prefix: String },

    /// Listing or download failure reported by the object store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The downloaded file does not hash to the listed e-tag.
    #[error("Checksums don't match for {key}: expected {expected}, got {computed}")]
    IntegrityMismatch {
        key: String,
        expected: String,
        computed: String,
    },

    /// The listing carried no e-tag, so the download cannot be verified.
    #[error("No e-tag listed for {key}, cannot verify download")]
    MissingETag { key: String },

    /// The e-tag belongs to a multipart upload and is not a content MD5.
    #[error("E-tag {etag} of {key} comes from a multipart upload and is not an MD5 checksum")]
    MultipartETag { key: String, etag: String },

    /// I/O error during local file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),
}
