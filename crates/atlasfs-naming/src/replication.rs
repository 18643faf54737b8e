//! Read-pressure replication and write invalidation
//!
//! Fires at the terminal node of every lock grant. Shared grants count
//! toward a per-file pressure threshold that triggers a copy-out to one
//! additional storage node; an exclusive grant destroys every replica
//! except the primary. Replicas are a read-scaling cache, never required
//! for correctness, so every RPC here is best effort with no retry.

use std::sync::Arc;

use atlasfs_core::rpc::StorageRpc;

use crate::registry::NodeRegistry;
use crate::tree::NamespaceNode;

/// Shared grants on one file between replication attempts.
pub const READ_PRESSURE_THRESHOLD: u32 = 20;

/// Decides when files gain and lose replicas.
///
/// Cloneable handle; clones share the registry and RPC client.
#[derive(Clone)]
pub struct ReplicationController {
    registry: Arc<NodeRegistry>,
    rpc: Arc<dyn StorageRpc>,
}

impl ReplicationController {
    pub fn new(registry: Arc<NodeRegistry>, rpc: Arc<dyn StorageRpc>) -> Self {
        Self { registry, rpc }
    }

    /// Counts one shared grant on `node`. Exactly the grant that carries
    /// the counter to the threshold triggers a replication attempt; the
    /// counter is then lowered by the threshold, keeping any pressure
    /// accrued past it by concurrent readers.
    pub async fn on_shared_grant(&self, path: &str, node: &NamespaceNode) {
        if node.bump_read_pressure() == READ_PRESSURE_THRESHOLD {
            node.relieve_read_pressure(READ_PRESSURE_THRESHOLD);
            self.replicate(path, node).await;
        }
    }

    /// Resets the pressure counter and invalidates every replica except
    /// the primary. After a write only the primary copy is current.
    pub async fn on_exclusive_grant(&self, path: &str, node: &NamespaceNode) {
        node.clear_read_pressure();
        self.invalidate(path, node).await;
    }

    /// Copies `path` to the first registered node that holds no replica
    /// yet, pulling from the primary source. No-op when every node already
    /// holds one.
    async fn replicate(&self, path: &str, node: &NamespaceNode) {
        let sources = node.sources_snapshot();
        let Some(primary) = sources.first().copied() else {
            return;
        };
        let Some(target_client) = self
            .registry
            .client_ports()
            .into_iter()
            .find(|port| !sources.contains(port))
        else {
            tracing::debug!(path, "every registered node already holds a replica");
            return;
        };
        let Some(target) = self.registry.command_addr_for_client(target_client) else {
            return;
        };

        let source = self.registry.client_addr(primary);
        if let Err(err) = self.rpc.copy(&target, path, &source).await {
            tracing::warn!(path, %target, %err, "replication copy failed");
        }
        // The target is recorded whether or not the copy RPC went through;
        // failed copies are not retried.
        node.append_source(target_client);
        tracing::info!(path, target = target_client, "replicated to storage node");
    }

    async fn invalidate(&self, path: &str, node: &NamespaceNode) {
        for client_port in node.take_extra_sources() {
            let Some(target) = self.registry.command_addr_for_client(client_port) else {
                continue;
            };
            if let Err(err) = self.rpc.delete(&target, path).await {
                tracing::warn!(path, %target, %err, "replica delete failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use atlasfs_core::mock_rpc::{MockStorageRpc, RpcCall};
    use atlasfs_core::rpc::NodeAddr;

    use super::*;

    fn controller_with_nodes(nodes: &[(u16, u16)]) -> (ReplicationController, Arc<MockStorageRpc>) {
        let registry = Arc::new(NodeRegistry::new());
        for (client, command) in nodes {
            registry.register("127.0.0.1", *client, *command).unwrap();
        }
        let rpc = Arc::new(MockStorageRpc::new());
        (
            ReplicationController::new(registry, Arc::clone(&rpc) as Arc<dyn StorageRpc>),
            rpc,
        )
    }

    #[tokio::test]
    async fn test_twentieth_shared_grant_triggers_one_copy() {
        let (controller, rpc) = controller_with_nodes(&[(9000, 9001), (9002, 9003)]);
        let node = NamespaceNode::new("x.txt", false, 9000);

        for _ in 0..19 {
            controller.on_shared_grant("/x.txt", &node).await;
        }
        assert!(rpc.copy_calls().is_empty());

        controller.on_shared_grant("/x.txt", &node).await;
        assert_eq!(
            rpc.copy_calls(),
            vec![RpcCall::Copy {
                node: NodeAddr::new("127.0.0.1", 9003),
                path: "/x.txt".to_string(),
                source: NodeAddr::new("127.0.0.1", 9000),
            }]
        );
        assert_eq!(node.sources_snapshot(), vec![9000, 9002]);
        assert_eq!(node.read_pressure(), 0);
    }

    #[tokio::test]
    async fn test_fortieth_grant_triggers_second_attempt() {
        let (controller, rpc) =
            controller_with_nodes(&[(9000, 9001), (9002, 9003), (9004, 9005)]);
        let node = NamespaceNode::new("x.txt", false, 9000);

        for _ in 0..40 {
            controller.on_shared_grant("/x.txt", &node).await;
        }
        assert_eq!(rpc.copy_calls().len(), 2);
        assert_eq!(node.sources_snapshot(), vec![9000, 9002, 9004]);
    }

    #[tokio::test]
    async fn test_no_eligible_target_takes_no_action() {
        let (controller, rpc) = controller_with_nodes(&[(9000, 9001)]);
        let node = NamespaceNode::new("x.txt", false, 9000);

        for _ in 0..20 {
            controller.on_shared_grant("/x.txt", &node).await;
        }
        assert!(rpc.copy_calls().is_empty());
        assert_eq!(node.sources_snapshot(), vec![9000]);
        // The pressure relief still happened on the 20th grant.
        assert_eq!(node.read_pressure(), 0);
    }

    #[tokio::test]
    async fn test_copy_failure_still_records_target() {
        let (controller, rpc) = controller_with_nodes(&[(9000, 9001), (9002, 9003)]);
        let node = NamespaceNode::new("x.txt", false, 9000);
        rpc.set_fail(true);

        for _ in 0..20 {
            controller.on_shared_grant("/x.txt", &node).await;
        }
        assert_eq!(rpc.copy_calls().len(), 1);
        assert_eq!(node.sources_snapshot(), vec![9000, 9002]);
    }

    #[tokio::test]
    async fn test_exclusive_grant_invalidates_extra_replicas() {
        let (controller, rpc) =
            controller_with_nodes(&[(9000, 9001), (9002, 9003), (9004, 9005)]);
        let node = NamespaceNode::new("x.txt", false, 9000);
        node.append_source(9002);
        node.append_source(9004);
        for _ in 0..7 {
            node.bump_read_pressure();
        }

        controller.on_exclusive_grant("/x.txt", &node).await;

        assert_eq!(node.sources_snapshot(), vec![9000]);
        assert_eq!(node.read_pressure(), 0);
        assert_eq!(
            rpc.delete_calls(),
            vec![
                RpcCall::Delete {
                    node: NodeAddr::new("127.0.0.1", 9003),
                    path: "/x.txt".to_string(),
                },
                RpcCall::Delete {
                    node: NodeAddr::new("127.0.0.1", 9005),
                    path: "/x.txt".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_exclusive_grant_with_single_source_sends_nothing() {
        let (controller, rpc) = controller_with_nodes(&[(9000, 9001)]);
        let node = NamespaceNode::new("x.txt", false, 9000);

        controller.on_exclusive_grant("/x.txt", &node).await;
        assert!(rpc.calls().is_empty());
        assert_eq!(node.sources_snapshot(), vec![9000]);
    }
}
