//! Storage operations behind the HTTP endpoints.
//!
//! [`StorageService`] validates wire paths, delegates byte work to
//! [`LocalDisk`], and implements `copy` by pulling the file from the
//! source node's client interface before writing it locally.

use std::sync::Arc;

use atlasfs_core::error::{DfsError, DfsResult};
use atlasfs_core::path;
use atlasfs_core::rpc::{NodeAddr, StorageRpc};

use crate::disk::LocalDisk;

pub struct StorageService {
    disk: LocalDisk,
    rpc: Arc<dyn StorageRpc>,
}

impl StorageService {
    pub fn new(disk: LocalDisk, rpc: Arc<dyn StorageRpc>) -> Self {
        Self { disk, rpc }
    }

    /// Create an empty file. `Ok(false)` when the path is the root,
    /// already exists, or cannot be created.
    pub async fn create(&self, raw: &str) -> DfsResult<bool> {
        let path = Self::sanitized(raw)?;
        Ok(self.disk.create(&path).await)
    }

    /// Delete a file or directory tree. `Ok(false)` when the path is the
    /// root or nothing is there.
    pub async fn delete(&self, raw: &str) -> DfsResult<bool> {
        let path = Self::sanitized(raw)?;
        Ok(self.disk.delete(&path).await)
    }

    /// Size of a regular file in bytes.
    pub async fn size(&self, raw: &str) -> DfsResult<i64> {
        let path = Self::sanitized(raw)?;
        self.disk.size(&path).await
    }

    /// Read `length` bytes at `offset`.
    pub async fn read(&self, raw: &str, offset: i64, length: i64) -> DfsResult<Vec<u8>> {
        let path = Self::sanitized(raw)?;
        self.disk.read(&path, offset, length).await
    }

    /// Write `data` at `offset`.
    pub async fn write(&self, raw: &str, offset: i64, data: &[u8]) -> DfsResult<bool> {
        let path = Self::sanitized(raw)?;
        self.disk.write(&path, offset, data).await
    }

    /// Replace the local copy of `path` with the one on `source`.
    ///
    /// Pulls size and contents over the source's client interface, then
    /// recreates the file locally. A source that cannot produce the file
    /// is reported as not found; a zero-byte file copies fine.
    pub async fn copy(&self, raw: &str, source: &NodeAddr) -> DfsResult<bool> {
        let path = Self::sanitized(raw)?;
        let size = self.rpc.size(source, &path).await.map_err(|err| {
            tracing::warn!(path, %source, %err, "copy source did not report a size");
            DfsError::FileNotFound(format!("{path} does not exist on the source node."))
        })?;
        let data = self.rpc.read(source, &path, 0, size).await.map_err(|err| {
            tracing::warn!(path, %source, %err, "copy source did not produce the file");
            DfsError::FileNotFound(format!("{path} could not be read from the source node."))
        })?;

        // Any stale local copy goes first so the write starts from empty.
        self.disk.delete(&path).await;
        if !self.disk.create(&path).await {
            return Err(DfsError::Io(format!("could not create {path} locally.")));
        }
        self.disk.write(&path, 0, &data).await?;
        tracing::info!(path, %source, bytes = data.len(), "copied file from source node");
        Ok(true)
    }

    fn sanitized(raw: &str) -> DfsResult<String> {
        if raw.is_empty() {
            return Err(DfsError::IllegalArgument("path is empty".to_string()));
        }
        Ok(path::sanitize(raw))
    }
}
