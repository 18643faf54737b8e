//! Rooted local filesystem access.
//!
//! [`LocalDisk`] pins every operation under one root directory: paths are
//! lexically re-rooted before they touch the filesystem, so `..` segments
//! cannot climb out of the storage root. The operation semantics follow
//! the wire contract rather than raw POSIX: `create` and `delete` answer
//! plain `false` instead of failing, `size` and `read` refuse
//! directories, and `write` extends files sparsely when the offset lies
//! past the end.

use std::io::SeekFrom;
use std::path::PathBuf;

use atlasfs_core::error::{DfsError, DfsResult};
use atlasfs_core::path::sanitize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Byte storage confined to one root directory.
///
/// Callers hand in wire paths (already sanitized by the service layer);
/// [`LocalDisk`] maps them to real locations under the root.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Real location of a wire path. Rooting before cleaning means no
    /// `..` sequence survives into the joined path.
    fn resolve(&self, path: &str) -> PathBuf {
        let rooted = if path.starts_with('/') {
            sanitize(path)
        } else {
            sanitize(&format!("/{path}"))
        };
        self.root.join(rooted.trim_start_matches('/'))
    }

    /// Create an empty file, making any missing parent directories.
    ///
    /// `false` for the root, for a path that already exists, and for I/O
    /// failures; the command interface reports those as unsuccessful
    /// rather than exceptional.
    pub async fn create(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let target = self.resolve(path);
        match tokio::fs::metadata(&target).await {
            Ok(_) => return false,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path, %err, "create probe failed");
                return false;
            }
        }
        if let Some(parent) = target.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(path, %err, "could not create parent directories");
                return false;
            }
        }
        match File::create(&target).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(path, %err, "could not create file");
                false
            }
        }
    }

    /// Delete a file or a directory tree. `false` for the root, for an
    /// absent path, and for I/O failures.
    pub async fn delete(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let target = self.resolve(path);
        let meta = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return false,
            Err(err) => {
                tracing::warn!(path, %err, "delete probe failed");
                return false;
            }
        };
        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        match removed {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path, %err, "delete failed");
                false
            }
        }
    }

    /// Size of a regular file in bytes. Directories and absent paths are
    /// both reported as not found.
    pub async fn size(&self, path: &str) -> DfsResult<i64> {
        let target = self.resolve(path);
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|_| DfsError::FileNotFound(format!("{path} does not exist.")))?;
        if meta.is_dir() {
            return Err(DfsError::FileNotFound(format!("{path} is a directory.")));
        }
        Ok(meta.len() as i64)
    }

    /// Read exactly `length` bytes at `offset`.
    ///
    /// The whole range must lie inside the file; a range that starts or
    /// ends past the end is out of bounds, not a short read.
    pub async fn read(&self, path: &str, offset: i64, length: i64) -> DfsResult<Vec<u8>> {
        if offset < 0 || length < 0 {
            return Err(DfsError::IndexOutOfBounds(
                "offset and length must be non-negative.".to_string(),
            ));
        }
        let target = self.resolve(path);
        let meta = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DfsError::FileNotFound(format!("{path} does not exist.")));
            }
            Err(err) => return Err(DfsError::Io(err.to_string())),
        };
        if meta.is_dir() {
            return Err(DfsError::FileNotFound(format!("{path} is a directory.")));
        }
        let end = offset.checked_add(length).ok_or_else(|| {
            DfsError::IndexOutOfBounds("offset plus length overflows.".to_string())
        })?;
        if end as u64 > meta.len() {
            return Err(DfsError::IndexOutOfBounds(format!(
                "range {offset}..{end} extends past the end of the file."
            )));
        }

        let mut file = File::open(&target).await?;
        file.seek(SeekFrom::Start(offset as u64)).await?;
        let mut data = vec![0u8; length as usize];
        file.read_exact(&mut data).await.map_err(|_| {
            DfsError::IndexOutOfBounds(format!(
                "range {offset}..{end} extends past the end of the file."
            ))
        })?;
        Ok(data)
    }

    /// Write `data` at `offset`, extending the file if the range ends
    /// past the current size. The file must already exist.
    pub async fn write(&self, path: &str, offset: i64, data: &[u8]) -> DfsResult<bool> {
        if path == "/" {
            return Err(DfsError::IllegalArgument(
                "cannot write to the root directory.".to_string(),
            ));
        }
        if offset < 0 {
            return Err(DfsError::IndexOutOfBounds(
                "offset must be non-negative.".to_string(),
            ));
        }
        let target = self.resolve(path);
        let meta = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DfsError::FileNotFound(format!("{path} does not exist.")));
            }
            Err(err) => return Err(DfsError::Io(err.to_string())),
        };
        if meta.is_dir() {
            return Err(DfsError::FileNotFound(format!("{path} is a directory.")));
        }

        let mut file = OpenOptions::new().write(true).open(&target).await?;
        file.seek(SeekFrom::Start(offset as u64)).await?;
        file.write_all(data).await?;
        // tokio buffers file writes on the blocking pool; without a flush
        // the data may not be on disk yet when this call returns.
        file.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> (tempfile::TempDir, LocalDisk) {
        let dir = tempfile::tempdir().unwrap();
        let disk = LocalDisk::new(dir.path());
        (dir, disk)
    }

    #[tokio::test]
    async fn test_create_then_write_then_read() {
        let (_dir, disk) = disk();
        assert!(disk.create("/docs/a.txt").await);
        assert!(disk.write("/docs/a.txt", 0, b"hello world").await.unwrap());
        assert_eq!(disk.size("/docs/a.txt").await.unwrap(), 11);
        let data = disk.read("/docs/a.txt", 6, 5).await.unwrap();
        assert_eq!(data, b"world");
    }

    #[tokio::test]
    async fn test_create_reports_false_not_errors() {
        let (_dir, disk) = disk();
        assert!(!disk.create("/").await);
        assert!(disk.create("/x.txt").await);
        assert!(!disk.create("/x.txt").await);
    }

    #[tokio::test]
    async fn test_delete_file_and_directory_tree() {
        let (dir, disk) = disk();
        assert!(disk.create("/d/inner/f.txt").await);
        assert!(disk.delete("/d").await);
        assert!(!dir.path().join("d").exists());
        assert!(!disk.delete("/d").await);
        assert!(!disk.delete("/").await);
    }

    #[tokio::test]
    async fn test_size_rejects_directories_and_absence() {
        let (_dir, disk) = disk();
        assert!(disk.create("/d/f.txt").await);
        assert!(matches!(
            disk.size("/d").await,
            Err(DfsError::FileNotFound(_))
        ));
        assert!(matches!(
            disk.size("/ghost").await,
            Err(DfsError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_bounds() {
        let (_dir, disk) = disk();
        assert!(disk.create("/b.txt").await);
        disk.write("/b.txt", 0, b"abcde").await.unwrap();

        assert!(matches!(
            disk.read("/b.txt", -1, 2).await,
            Err(DfsError::IndexOutOfBounds(_))
        ));
        assert!(matches!(
            disk.read("/b.txt", 0, -1).await,
            Err(DfsError::IndexOutOfBounds(_))
        ));
        assert!(matches!(
            disk.read("/b.txt", 3, 3).await,
            Err(DfsError::IndexOutOfBounds(_))
        ));
        assert_eq!(disk.read("/b.txt", 0, 0).await.unwrap(), b"");
        assert_eq!(disk.read("/b.txt", 5, 0).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn test_write_past_end_extends_sparsely() {
        let (_dir, disk) = disk();
        assert!(disk.create("/s.txt").await);
        disk.write("/s.txt", 4, b"xy").await.unwrap();
        assert_eq!(disk.size("/s.txt").await.unwrap(), 6);
        let data = disk.read("/s.txt", 0, 6).await.unwrap();
        assert_eq!(data, b"\0\0\0\0xy");
    }

    #[tokio::test]
    async fn test_write_requires_existing_file() {
        let (_dir, disk) = disk();
        assert!(matches!(
            disk.write("/ghost", 0, b"x").await,
            Err(DfsError::FileNotFound(_))
        ));
        assert!(matches!(
            disk.write("/", 0, b"x").await,
            Err(DfsError::IllegalArgument(_))
        ));
        assert!(matches!(
            disk.write("/ghost", -2, b"x").await,
            Err(DfsError::IndexOutOfBounds(_))
        ));
    }

    #[tokio::test]
    async fn test_escape_attempts_stay_inside_root() {
        let (dir, disk) = disk();
        assert!(disk.create("../escapee.txt").await);
        assert!(dir.path().join("escapee.txt").exists());
        assert!(!dir.path().parent().unwrap().join("escapee.txt").exists());
    }
}
