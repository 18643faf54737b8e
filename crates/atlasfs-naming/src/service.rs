//! Naming operations
//!
//! [`NamingService`] implements the behavior behind every HTTP endpoint:
//! registration, namespace queries, file/directory creation, deletion, and
//! path locking. It owns the tree, the registry, and the lock manager;
//! handlers stay thin and only translate between JSON and these methods.
//!
//! Paths arrive raw from the wire and are sanitized here, uniformly,
//! before any lookup. An empty raw path is rejected before sanitization
//! since cleaning would turn it into the root.

use std::sync::Arc;

use atlasfs_core::error::{DfsError, DfsResult};
use atlasfs_core::path;
use atlasfs_core::proto::StorageAddress;
use atlasfs_core::rpc::StorageRpc;

use crate::lock::PathLockManager;
use crate::registry::NodeRegistry;
use crate::replication::ReplicationController;
use crate::tree::NamespaceTree;

pub struct NamingService {
    tree: Arc<NamespaceTree>,
    registry: Arc<NodeRegistry>,
    rpc: Arc<dyn StorageRpc>,
    locks: PathLockManager,
}

impl NamingService {
    /// `default_source` seeds the root node's replica source, inherited by
    /// paths created before any explicit owner is known. The naming server
    /// passes its registration port here.
    pub fn new(default_source: u16, rpc: Arc<dyn StorageRpc>) -> Self {
        let tree = Arc::new(NamespaceTree::new(default_source));
        let registry = Arc::new(NodeRegistry::new());
        let replication = ReplicationController::new(Arc::clone(&registry), Arc::clone(&rpc));
        let locks = PathLockManager::new(Arc::clone(&tree), replication);
        Self {
            tree,
            registry,
            rpc,
            locks,
        }
    }

    /// Admits a storage node and merges its file inventory into the tree.
    ///
    /// Files the tree already knows are returned instead of merged; the
    /// node is expected to delete its local copies of those. An inventory
    /// of exactly `["/"]` means the node starts empty.
    pub async fn register(
        &self,
        ip: &str,
        client_port: u16,
        command_port: u16,
        files: &[String],
    ) -> DfsResult<Vec<String>> {
        self.registry.register(ip, client_port, command_port)?;
        tracing::info!(
            ip,
            client_port,
            command_port,
            files = files.len(),
            "storage node registered"
        );

        if files.len() == 1 && files[0] == "/" {
            return Ok(Vec::new());
        }

        let mut duplicates = Vec::new();
        for file in files {
            if file.is_empty() {
                continue;
            }
            let path = path::sanitize(file);
            if self.tree.find(&path).is_some() {
                duplicates.push(file.clone());
            } else {
                self.tree.add(&path, false, Some(client_port)).await;
            }
        }
        Ok(duplicates)
    }

    /// Whether `path` names a directory. The root always does.
    pub fn is_directory(&self, raw: &str) -> DfsResult<bool> {
        const INFO: &str = "the file/directory or parent directory does not exist.";
        if raw.is_empty() {
            return Err(DfsError::IllegalArgument(INFO.to_string()));
        }
        let path = path::sanitize(raw);
        if path == "/" {
            return Ok(true);
        }
        let node = self
            .tree
            .find(&path)
            .ok_or_else(|| DfsError::FileNotFound(INFO.to_string()))?;
        Ok(node.is_dir())
    }

    /// Names of the direct children of a directory.
    pub fn list(&self, raw: &str) -> DfsResult<Vec<String>> {
        const INFO: &str = "the directory does not exist or the path is invalid.";
        if raw.is_empty() {
            return Err(DfsError::IllegalArgument(INFO.to_string()));
        }
        let path = path::sanitize(raw);
        let node = self
            .tree
            .find(&path)
            .ok_or_else(|| DfsError::FileNotFound(INFO.to_string()))?;
        if !node.is_dir() {
            return Err(DfsError::FileNotFound(INFO.to_string()));
        }
        Ok(node.child_names())
    }

    /// Creates a directory node. `false` when the path already exists.
    pub async fn create_directory(&self, raw: &str) -> DfsResult<bool> {
        let path = Self::sanitized(raw)?;
        if self.tree.find(&path).is_some() {
            return Ok(false);
        }
        self.require_parent_directory(&path)?;
        self.tree.add(&path, true, None).await;
        Ok(true)
    }

    /// Creates a file node and asks the first registered storage node to
    /// materialize it on disk. `false` when the path already exists.
    pub async fn create_file(&self, raw: &str) -> DfsResult<bool> {
        // Checked before the path so a bare cluster reports IllegalState
        // rather than a path error.
        let Some(placement) = self.registry.first_command_addr() else {
            return Err(DfsError::IllegalState(
                "no storage servers are registered with the naming server.".to_string(),
            ));
        };

        let path = Self::sanitized(raw)?;
        if self.tree.find(&path).is_some() {
            return Ok(false);
        }
        self.require_parent_directory(&path)?;

        self.tree.add(&path, false, None).await;
        if let Err(err) = self.rpc.create(&placement, &path).await {
            tracing::warn!(path, %placement, %err, "storage create failed");
        }
        Ok(true)
    }

    /// Deletes the bytes of `path` on every registered storage node, under
    /// an exclusive hold on the root. The tree node itself stays; the
    /// namespace only forgets paths on restart.
    pub async fn delete(&self, raw: &str) -> DfsResult<()> {
        let path = Self::sanitized(raw)?;
        if self.tree.find(&path).is_none() {
            return Err(DfsError::FileNotFound(format!("{path} does not exist.")));
        }

        let root = self.tree.root();
        root.lock().acquire(true).await;
        for target in self.registry.command_addrs() {
            if let Err(err) = self.rpc.delete(&target, &path).await {
                tracing::warn!(path, %target, %err, "storage delete failed");
            }
        }
        root.lock().release(true);
        Ok(())
    }

    /// Which storage node a client should contact for a file's bytes.
    pub fn get_storage(&self, raw: &str) -> DfsResult<StorageAddress> {
        if raw.is_empty() {
            return Err(DfsError::IllegalArgument("path is empty".to_string()));
        }
        let path = path::sanitize(raw);
        let node = self
            .tree
            .find(&path)
            .ok_or_else(|| DfsError::FileNotFound(format!("{path} does not exist.")))?;
        if node.is_dir() {
            return Err(DfsError::FileNotFound(format!("{path} is a directory.")));
        }
        let primary = node.primary_source().ok_or_else(|| {
            DfsError::FileNotFound(format!("no storage node holds {path}."))
        })?;
        let addr = self.registry.client_addr(primary);
        Ok(StorageAddress {
            server_ip: addr.host,
            server_port: addr.port,
        })
    }

    pub async fn lock(&self, raw: &str, exclusive: bool) -> DfsResult<()> {
        let path = Self::sanitized(raw)?;
        self.locks.lock(&path, exclusive).await
    }

    pub async fn unlock(&self, raw: &str, exclusive: bool) -> DfsResult<()> {
        let path = Self::sanitized(raw)?;
        self.locks.unlock(&path, exclusive).await
    }

    fn sanitized(raw: &str) -> DfsResult<String> {
        if raw.is_empty() {
            return Err(DfsError::IllegalArgument("path is empty".to_string()));
        }
        Ok(path::sanitize(raw))
    }

    fn require_parent_directory(&self, path: &str) -> DfsResult<()> {
        let parent = path::parent(path);
        match self.tree.find(&parent) {
            Some(node) if node.is_dir() => Ok(()),
            _ => Err(DfsError::FileNotFound(format!(
                "the parent directory of {path} does not exist."
            ))),
        }
    }
}
