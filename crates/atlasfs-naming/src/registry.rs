//! Storage node registry
//!
//! Registration-ordered roster of every storage node that has announced
//! itself. A node is identified by its client port; the command port is
//! what the naming server dials for create/delete/copy RPCs. Entries are
//! never removed; the first registered node doubles as the placement
//! target for new files.

use std::sync::{Mutex, MutexGuard};

use atlasfs_core::error::{DfsError, DfsResult};
use atlasfs_core::rpc::NodeAddr;

/// One storage node as it announced itself at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredNode {
    pub ip: String,
    pub client_port: u16,
    pub command_port: u16,
}

/// Thread-safe roster of registered storage nodes, in registration order.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: Mutex<Vec<RegisteredNode>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node. The duplicate check and the insert happen under one
    /// guard, so two racing registrations of the same command port cannot
    /// both succeed.
    pub fn register(
        &self,
        ip: impl Into<String>,
        client_port: u16,
        command_port: u16,
    ) -> DfsResult<()> {
        let mut nodes = self.guard();
        if nodes.iter().any(|n| n.command_port == command_port) {
            return Err(DfsError::Conflict(
                "This storage server is already registered.".to_string(),
            ));
        }
        nodes.push(RegisteredNode {
            ip: ip.into(),
            client_port,
            command_port,
        });
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Client ports of every node, in registration order. This is the
    /// candidate list the replication controller scans.
    pub fn client_ports(&self) -> Vec<u16> {
        self.guard().iter().map(|n| n.client_port).collect()
    }

    /// Command interface of the first registered node, where new files are
    /// placed.
    pub fn first_command_addr(&self) -> Option<NodeAddr> {
        self.guard()
            .first()
            .map(|n| NodeAddr::new(&n.ip, n.command_port))
    }

    /// Command interfaces of every node, in registration order.
    pub fn command_addrs(&self) -> Vec<NodeAddr> {
        self.guard()
            .iter()
            .map(|n| NodeAddr::new(&n.ip, n.command_port))
            .collect()
    }

    /// Maps a node's client port to its command interface.
    pub fn command_addr_for_client(&self, client_port: u16) -> Option<NodeAddr> {
        self.guard()
            .iter()
            .find(|n| n.client_port == client_port)
            .map(|n| NodeAddr::new(&n.ip, n.command_port))
    }

    /// Client interface for a client port. Falls back to loopback for
    /// sources that predate any registration, such as the tree's bootstrap
    /// default.
    pub fn client_addr(&self, client_port: u16) -> NodeAddr {
        self.guard()
            .iter()
            .find(|n| n.client_port == client_port)
            .map(|n| NodeAddr::new(&n.ip, client_port))
            .unwrap_or_else(|| NodeAddr::new("127.0.0.1", client_port))
    }

    fn guard(&self) -> MutexGuard<'_, Vec<RegisteredNode>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }
}
