//! # AtlasFS Core
//!
//! Shared foundation for the AtlasFS naming and storage servers.
//!
//! Both tiers speak the same JSON-over-HTTP dialect: requests are POST
//! bodies, failures are `{exception_type, exception_info}` objects, and
//! file data travels base64-encoded. This crate owns that dialect so the
//! servers only implement behavior.
//!
//! ## Key Traits
//!
//! - [`StorageRpc`]: the calls a storage node accepts (create, delete, size,
//!   read, write, copy), abstracted so lock and replication logic can be
//!   tested without sockets
//!
//! ## Key Types
//!
//! - [`DfsError`]: the error taxonomy every operation maps onto the wire
//! - [`NodeAddr`]: host/port pair addressing one storage-node interface
//! - [`HttpStorageRpc`]: the real reqwest-backed RPC client
//! - [`MockStorageRpc`]: recording in-memory client for tests

pub mod error;
pub mod mock_rpc;
pub mod path;
pub mod proto;
pub mod rpc;

// Re-export main types
pub use error::*;
pub use mock_rpc::*;
pub use path::*;
pub use proto::*;
pub use rpc::*;
