//! Mock storage RPC implementation for testing
//!
//! Records every call it receives and answers from an in-memory file map,
//! so naming-server replication and storage-server copy logic can be
//! exercised without sockets or real storage nodes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::RpcError;
use crate::rpc::{NodeAddr, StorageRpc};

/// One recorded RPC, with everything the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    Create {
        node: NodeAddr,
        path: String,
    },
    Delete {
        node: NodeAddr,
        path: String,
    },
    Size {
        node: NodeAddr,
        path: String,
    },
    Read {
        node: NodeAddr,
        path: String,
        offset: i64,
        length: i64,
    },
    Write {
        node: NodeAddr,
        path: String,
        offset: i64,
        data: Vec<u8>,
    },
    Copy {
        node: NodeAddr,
        path: String,
        source: NodeAddr,
    },
}

/// A recording [`StorageRpc`] backed by an in-memory file map.
///
/// `size` and `read` answer from files seeded with [`set_file`]; unknown
/// paths produce the same remote FileNotFound a real node would. `create`,
/// `delete`, `write`, and `copy` succeed unconditionally (writes update the
/// file map). [`set_fail`] makes every call fail at the transport level.
///
/// [`set_file`]: MockStorageRpc::set_file
/// [`set_fail`]: MockStorageRpc::set_fail
#[derive(Debug, Default)]
pub struct MockStorageRpc {
    calls: Mutex<Vec<RpcCall>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail: AtomicBool,
}

impl MockStorageRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file the mock will answer `size`/`read` for.
    pub fn set_file(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files_guard().insert(path.into(), data.into());
    }

    /// Make every subsequent call fail as if the node were unreachable.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Everything recorded so far, in call order.
    pub fn calls(&self) -> Vec<RpcCall> {
        self.calls_guard().clone()
    }

    /// Recorded copy calls only.
    pub fn copy_calls(&self) -> Vec<RpcCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RpcCall::Copy { .. }))
            .collect()
    }

    /// Recorded delete calls only.
    pub fn delete_calls(&self) -> Vec<RpcCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RpcCall::Delete { .. }))
            .collect()
    }

    /// Current contents of a seeded or written file.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files_guard().get(path).cloned()
    }

    fn record(&self, call: RpcCall) -> Result<(), RpcError> {
        self.calls_guard().push(call);
        if self.fail.load(Ordering::SeqCst) {
            Err(RpcError::Transport {
                url: "mock".to_string(),
                message: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn calls_guard(&self) -> std::sync::MutexGuard<'_, Vec<RpcCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn files_guard(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remote_not_found(path: &str) -> RpcError {
        RpcError::Remote {
            exception_type: "FileNotFoundException".to_string(),
            exception_info: format!("{path} does not exist."),
        }
    }
}

#[async_trait]
impl StorageRpc for MockStorageRpc {
    async fn create(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError> {
        self.record(RpcCall::Create {
            node: node.clone(),
            path: path.to_string(),
        })?;
        self.files_guard().entry(path.to_string()).or_default();
        Ok(true)
    }

    async fn delete(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError> {
        self.record(RpcCall::Delete {
            node: node.clone(),
            path: path.to_string(),
        })?;
        Ok(self.files_guard().remove(path).is_some())
    }

    async fn size(&self, node: &NodeAddr, path: &str) -> Result<i64, RpcError> {
        self.record(RpcCall::Size {
            node: node.clone(),
            path: path.to_string(),
        })?;
        let files = self.files_guard();
        let data = files.get(path).ok_or_else(|| Self::remote_not_found(path))?;
        Ok(data.len() as i64)
    }

    async fn read(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        length: i64,
    ) -> Result<Vec<u8>, RpcError> {
        self.record(RpcCall::Read {
            node: node.clone(),
            path: path.to_string(),
            offset,
            length,
        })?;
        let files = self.files_guard();
        let data = files.get(path).ok_or_else(|| Self::remote_not_found(path))?;
        if offset < 0 || length < 0 || (offset + length) as usize > data.len() {
            return Err(RpcError::Remote {
                exception_type: "IndexOutOfBoundsException".to_string(),
                exception_info: format!("offset {offset} length {length}"),
            });
        }
        Ok(data[offset as usize..(offset + length) as usize].to_vec())
    }

    async fn write(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        data: &[u8],
    ) -> Result<bool, RpcError> {
        self.record(RpcCall::Write {
            node: node.clone(),
            path: path.to_string(),
            offset,
            data: data.to_vec(),
        })?;
        if offset < 0 {
            return Err(RpcError::Remote {
                exception_type: "IndexOutOfBoundsException".to_string(),
                exception_info: format!("offset {offset}"),
            });
        }
        let mut files = self.files_guard();
        let file = files.entry(path.to_string()).or_default();
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(true)
    }

    async fn copy(
        &self,
        node: &NodeAddr,
        path: &str,
        source: &NodeAddr,
    ) -> Result<bool, RpcError> {
        self.record(RpcCall::Copy {
            node: node.clone(),
            path: path.to_string(),
            source: source.clone(),
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let mock = MockStorageRpc::new();
        let node = NodeAddr::new("127.0.0.1", 9001);
        let source = NodeAddr::new("127.0.0.1", 9000);

        mock.create(&node, "/a.txt").await.unwrap();
        mock.copy(&node, "/a.txt", &source).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], RpcCall::Create { .. }));
        assert_eq!(
            calls[1],
            RpcCall::Copy {
                node: node.clone(),
                path: "/a.txt".to_string(),
                source: source.clone(),
            }
        );
    }

    #[tokio::test]
    async fn test_seeded_file_serves_size_and_read() {
        let mock = MockStorageRpc::new();
        let node = NodeAddr::new("127.0.0.1", 9000);
        mock.set_file("/x.txt", b"hello".to_vec());

        assert_eq!(mock.size(&node, "/x.txt").await.unwrap(), 5);
        assert_eq!(mock.read(&node, "/x.txt", 1, 3).await.unwrap(), b"ell");
        assert!(mock.size(&node, "/missing").await.is_err());
        assert!(mock.read(&node, "/x.txt", 0, 9).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_still_records() {
        let mock = MockStorageRpc::new();
        let node = NodeAddr::new("127.0.0.1", 9001);
        mock.set_fail(true);

        assert!(mock.delete(&node, "/x.txt").await.is_err());
        assert_eq!(mock.delete_calls().len(), 1);
    }
}
