//! RPC error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors from dialing, calling or parsing responses from the node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// HTTP request failed (connection refused, non-2xx status, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket connect/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The response parsed as JSON-RPC but not as the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The connection was closed locally and must be re-dialed.
    #[error("connection closed")]
    Closed,

    /// Every connect attempt failed.
    #[error("could not connect after {attempts} attempts: {last}")]
    ConnectExhausted { attempts: u32, last: String },
}

impl RpcError {
    /// Returns `true` for transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::WebSocket(_) | Self::Timeout { .. } | Self::Closed | Self::Rpc(_)
        )
    }
}
