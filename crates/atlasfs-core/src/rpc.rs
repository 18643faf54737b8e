//! Storage-node RPC client
//!
//! The [`StorageRpc`] trait is the seam between namespace logic and the
//! network: the naming server drives replication, invalidation, and file
//! placement through it, and a storage node uses it to pull bytes from a
//! peer during `storage_copy`. The real implementation is
//! [`HttpStorageRpc`]; tests use [`MockStorageRpc`](crate::MockStorageRpc).
//!
//! All calls are synchronous round-trips with no retry. A non-2xx response
//! carrying an `{exception_type, exception_info}` body becomes
//! [`RpcError::Remote`]; everything else that goes wrong is transport or
//! payload failure.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RpcError;
use crate::proto::{
    BooleanResponse, CopyRequest, DataResponse, ExceptionBody, PathRequest, ReadRequest,
    SizeResponse, WriteRequest,
};

/// One reachable interface of a storage node (client or command side).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URL of one RPC endpoint on this interface.
    pub fn endpoint(&self, name: &str) -> String {
        format!("http://{}:{}/{}", self.host, self.port, name)
    }
}

impl std::fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The RPC surface a storage node accepts.
///
/// `create`, `delete`, and `copy` are command-interface calls addressed to a
/// node's command port; `size`, `read`, and `write` are client-interface
/// calls addressed to its client port. The trait does not enforce the
/// distinction; addressing is the caller's contract.
#[async_trait]
pub trait StorageRpc: Send + Sync {
    /// Create an empty file (and missing parent directories) on the node.
    async fn create(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError>;

    /// Delete a file or directory tree on the node.
    async fn delete(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError>;

    /// Size of a regular file on the node.
    async fn size(&self, node: &NodeAddr, path: &str) -> Result<i64, RpcError>;

    /// Read `length` bytes at `offset`.
    async fn read(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        length: i64,
    ) -> Result<Vec<u8>, RpcError>;

    /// Write `data` at `offset`.
    async fn write(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        data: &[u8],
    ) -> Result<bool, RpcError>;

    /// Instruct `node` to pull `path` from `source` (a client interface).
    async fn copy(&self, node: &NodeAddr, path: &str, source: &NodeAddr)
    -> Result<bool, RpcError>;
}

/// reqwest-backed [`StorageRpc`].
#[derive(Debug, Clone)]
pub struct HttpStorageRpc {
    client: reqwest::Client,
}

impl HttpStorageRpc {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// POST `body` to `url` and decode a `T` from a 2xx response, or a
    /// structured exception from anything else.
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, RpcError> {
        tracing::debug!(%url, "storage rpc");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| RpcError::Payload {
                url,
                message: e.to_string(),
            })
        } else {
            let body: ExceptionBody =
                response.json().await.map_err(|e| RpcError::Payload {
                    url,
                    message: e.to_string(),
                })?;
            Err(RpcError::Remote {
                exception_type: body.exception_type,
                exception_info: body.exception_info,
            })
        }
    }
}

impl Default for HttpStorageRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRpc for HttpStorageRpc {
    async fn create(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError> {
        let body = PathRequest { path: path.into() };
        let reply: BooleanResponse = self.call(node.endpoint("storage_create"), &body).await?;
        Ok(reply.success)
    }

    async fn delete(&self, node: &NodeAddr, path: &str) -> Result<bool, RpcError> {
        let body = PathRequest { path: path.into() };
        let reply: BooleanResponse = self.call(node.endpoint("storage_delete"), &body).await?;
        Ok(reply.success)
    }

    async fn size(&self, node: &NodeAddr, path: &str) -> Result<i64, RpcError> {
        let body = PathRequest { path: path.into() };
        let reply: SizeResponse = self.call(node.endpoint("storage_size"), &body).await?;
        Ok(reply.size)
    }

    async fn read(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        length: i64,
    ) -> Result<Vec<u8>, RpcError> {
        let url = node.endpoint("storage_read");
        let body = ReadRequest {
            path: path.into(),
            offset,
            length,
        };
        let reply: DataResponse = self.call(url.clone(), &body).await?;
        BASE64.decode(&reply.data).map_err(|e| RpcError::Payload {
            url,
            message: e.to_string(),
        })
    }

    async fn write(
        &self,
        node: &NodeAddr,
        path: &str,
        offset: i64,
        data: &[u8],
    ) -> Result<bool, RpcError> {
        let body = WriteRequest {
            path: path.into(),
            offset,
            data: BASE64.encode(data),
        };
        let reply: BooleanResponse = self.call(node.endpoint("storage_write"), &body).await?;
        Ok(reply.success)
    }

    async fn copy(
        &self,
        node: &NodeAddr,
        path: &str,
        source: &NodeAddr,
    ) -> Result<bool, RpcError> {
        let body = CopyRequest {
            path: path.into(),
            server_ip: source.host.clone(),
            server_port: source.port,
        };
        let reply: BooleanResponse = self.call(node.endpoint("storage_copy"), &body).await?;
        Ok(reply.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let addr = NodeAddr::new("127.0.0.1", 9001);
        assert_eq!(
            addr.endpoint("storage_copy"),
            "http://127.0.0.1:9001/storage_copy"
        );
        assert_eq!(format!("{}", addr), "127.0.0.1:9001");
    }
}
