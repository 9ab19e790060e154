//! The `RpcTransport` trait: one request in, one response out.

use async_trait::async_trait;

use crate::error::RpcError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// A JSON-RPC transport bound to one endpoint.
///
/// Implementations must be `Send + Sync`; the trait is object-safe.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single request and wait for its response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError>;

    /// Release the underlying connection. Later sends fail with `RpcError::Closed`.
    async fn close(&self) {}

    /// Endpoint URL.
    fn url(&self) -> &str;
}
