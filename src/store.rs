//! Object storage access.
//!
//! The downloader only needs two operations from the bucket: a full listing
//! under a key prefix and a download of one object to a local path. They sit
//! behind [`ObjectStore`] so the phases can run against S3 or a test double.

use crate::types::ObjectEntry;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Errors reported by an [`ObjectStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to list objects under '{prefix}': {message}")]
    List { prefix: String, message: String },

    #[error("failed to download {key}: {message}")]
    Download { key: String, message: String },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object whose key starts with `prefix`, following pagination.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    /// Writes the content of `key` to `dest`, replacing any existing file.
    /// Returns the number of bytes written.
    async fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError>;
}

/// [`ObjectStore`] backed by the AWS SDK.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the default provider chain (environment, shared
    /// profile, instance metadata).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&sdk_config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StoreError::List {
                prefix: prefix.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    entries.push(ObjectEntry::new(key, object.e_tag().map(str::to_string)));
                }
            }
        }

        debug!(bucket = %self.bucket, prefix, count = entries.len(), "S3 list ok");
        Ok(entries)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
        let download_error = |message: String| StoreError::Download {
            key: key.to_string(),
            message,
        };
        let write_error = |source: io::Error| StoreError::Write {
            path: dest.to_path_buf(),
            source,
        };

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| download_error(DisplayErrorContext(&e).to_string()))?;

        let mut body = output.body;
        let mut file = BufWriter::new(tokio::fs::File::create(dest).await.map_err(write_error)?);
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| download_error(DisplayErrorContext(&e).to_string()))?
        {
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;

        debug!(bucket = %self.bucket, key, bytes = written, "S3 GET ok");
        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory bucket used by the unit tests.

    use super::*;
    use md5::{Digest, Md5};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        objects: BTreeMap<String, Vec<u8>>,
        etags: HashMap<String, Option<String>>,
        failures: Mutex<HashMap<String, usize>>,
        list_calls: AtomicUsize,
        downloads: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_object(mut self, key: &str, content: &[u8]) -> Self {
            self.objects.insert(key.to_string(), content.to_vec());
            self
        }

        /// Overrides the e-tag listed for `key`; `None` lists no e-tag at all.
        pub(crate) fn with_etag(mut self, key: &str, etag: Option<&str>) -> Self {
            self.etags.insert(key.to_string(), etag.map(str::to_string));
            self
        }

        /// Makes the next `times` downloads of `key` fail.
        pub(crate) fn failing(self, key: &str, times: usize) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(key.to_string(), times);
            self
        }

        pub(crate) fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn downloads(&self) -> Vec<String> {
            self.downloads.lock().unwrap().clone()
        }

        fn etag_of(&self, key: &str, content: &[u8]) -> Option<String> {
            match self.etags.get(key) {
                Some(etag) => etag.clone(),
                None => Some(format!("\"{:x}\"", Md5::digest(content))),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .objects
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, content)| ObjectEntry::new(key.clone(), self.etag_of(key, content)))
                .collect())
        }

        async fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
            self.downloads.lock().unwrap().push(key.to_string());

            if let Some(remaining) = self.failures.lock().unwrap().get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StoreError::Download {
                        key: key.to_string(),
                        message: "connection reset".to_string(),
                    });
                }
            }

            let content = self.objects.get(key).ok_or_else(|| StoreError::Download {
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
            })?;
            std::fs::write(dest, content).map_err(|source| StoreError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
            Ok(content.len() as u64)
        }
    }
}
