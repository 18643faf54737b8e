//! # AtlasFS Naming Server
//!
//! The metadata tier of AtlasFS. Keeps the whole directory tree in memory,
//! arbitrates shared/exclusive access to every path through per-node lock
//! queues, and decides when read-hot files get replicated to additional
//! storage nodes (and when writes invalidate those replicas).
//!
//! Storage nodes register here at startup; clients ask here where a file
//! lives, then talk to that storage node directly for bytes.
//!
//! ## Key Types
//!
//! - [`NamespaceTree`]: the in-memory directory tree, one node per path
//! - [`NodeLock`]: per-node queued reader/writer lock with FIFO fairness
//! - [`PathLockManager`]: root-to-leaf lock acquisition over whole paths
//! - [`NodeRegistry`]: registration-ordered roster of storage nodes
//! - [`ReplicationController`]: read-pressure bookkeeping and replica RPCs
//! - [`NamingService`]: the operations behind every HTTP endpoint

pub mod config;
pub mod lock;
pub mod registry;
pub mod replication;
pub mod server;
pub mod service;
pub mod tree;

// Re-export main types
pub use config::*;
pub use lock::*;
pub use registry::*;
pub use replication::*;
pub use server::*;
pub use service::*;
pub use tree::*;
