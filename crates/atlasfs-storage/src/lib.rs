//! # AtlasFS Storage Server
//!
//! The byte tier of AtlasFS. Stores file contents under a local root
//! directory and exposes them over two HTTP interfaces: the client
//! interface (size/read/write) that DFS clients hit directly once the
//! naming server has told them where a file lives, and the command
//! interface (create/delete/copy) the naming server drives during
//! placement, deletion, and replication.
//!
//! At startup the server scans its root, registers the inventory with the
//! naming server, and deletes whatever files the naming server reports as
//! already owned elsewhere.
//!
//! ## Key Types
//!
//! - [`LocalDisk`]: rooted filesystem access with the byte-level semantics
//! - [`StorageService`]: the operations behind every HTTP endpoint
//! - [`StorageConfig`]: ports, naming-server address, and storage root

pub mod config;
pub mod disk;
pub mod registration;
pub mod server;
pub mod service;

// Re-export main types
pub use config::*;
pub use disk::*;
pub use registration::*;
pub use server::*;
pub use service::*;
