//! File verification utilities (MD5 checksums against S3 e-tags).

use crate::error::DumpError;
use std::path::Path;
use tracing::debug;

/// Read size used while hashing. Memory use does not depend on file size.
const CHUNK_SIZE: usize = 4096;

/// Computes the MD5 hash of a local file.
///
/// The file is read in fixed-size chunks on the blocking pool. Its handle is
/// dropped before the hash is returned.
///
/// # Returns
///
/// The MD5 hash as a lowercase hexadecimal string, or an error.
pub async fn compute_file_md5(path: &Path) -> Result<String, DumpError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use md5::{Digest, Md5};
        use std::io::Read;

        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Md5::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok::<String, DumpError>(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| DumpError::IoError(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Formats a hex digest the way S3 returns e-tags, wrapped in double quotes.
pub fn quoted_etag(hex_digest: &str) -> String {
    format!("\"{}\"", hex_digest)
}

/// Multipart e-tags carry a `-<parts>` suffix and are not content hashes.
fn is_multipart_etag(etag: &str) -> bool {
    etag.trim_matches('"').contains('-')
}

/// Checks a downloaded file against the e-tag listed for `key`.
///
/// # Arguments
///
/// * `key` - Object key, used in error messages
/// * `path` - Local file to hash
/// * `expected` - E-tag from the listing, quotes included
///
/// # Returns
///
/// `Ok(())` when the quoted MD5 of the file equals `expected`.
pub async fn verify_download(
    key: &str,
    path: &Path,
    expected: Option<&str>,
) -> Result<(), DumpError> {
    let expected = expected.ok_or_else(|| DumpError::MissingETag {
        key: key.to_string(),
    })?;

    if is_multipart_etag(expected) {
        return Err(DumpError::MultipartETag {
            key: key.to_string(),
            etag: expected.to_string(),
        });
    }

    let computed = quoted_etag(&compute_file_md5(path).await?);
    if computed != expected {
        return Err(DumpError::IntegrityMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            computed,
        });
    }

    debug!("MD5 verified for {}", key);
    Ok(())
}
