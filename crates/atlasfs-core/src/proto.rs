//! Wire messages
//!
//! One struct per JSON body exchanged between clients, the naming server,
//! and storage nodes. Field names are the wire contract; offsets and
//! lengths are signed so out-of-range values survive deserialization and
//! can be rejected as IndexOutOfBounds instead of failing to parse.

use serde::{Deserialize, Serialize};

use crate::error::DfsError;

/// Request naming a single path (`/is_directory`, `/list`, `/delete`,
/// `storage_create`, `storage_delete`, `storage_size`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

/// Request for `/lock` and `/unlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub path: String,
    pub exclusive: bool,
}

/// Generic `{success}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooleanResponse {
    pub success: bool,
}

/// Response body listing directory children or stale replica paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

/// `storage_size` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeResponse {
    pub size: i64,
}

/// `storage_read` response; `data` is standard base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: String,
}

/// `storage_read` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub path: String,
    pub offset: i64,
    pub length: i64,
}

/// `storage_write` request; `data` is standard base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    pub path: String,
    pub offset: i64,
    pub data: String,
}

/// `storage_copy` request: the receiving node pulls `path` from the client
/// interface at `server_ip:server_port`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRequest {
    pub path: String,
    pub server_ip: String,
    pub server_port: u16,
}

/// `/get_storage` response: the primary source's client interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAddress {
    pub server_ip: String,
    pub server_port: u16,
}

/// `/register` request: a storage node announcing itself and its inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub storage_ip: String,
    pub client_port: u16,
    pub command_port: u16,
    pub files: Vec<String>,
}

/// `/register` response: paths the node must delete locally because another
/// node already owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub files: Vec<String>,
}

/// Structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionBody {
    pub exception_type: String,
    pub exception_info: String,
}

impl From<&DfsError> for ExceptionBody {
    fn from(err: &DfsError) -> Self {
        Self {
            exception_type: err.exception_type().to_string(),
            exception_info: err.info().to_string(),
        }
    }
}
