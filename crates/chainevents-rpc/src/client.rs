//! The EVM calls the indexer makes, behind the `EvmRpc` seam.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use chainevents_core::{hex_prefixed, BlockHeader, RawLog};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::request::JsonRpcRequest;
use crate::transport::RpcTransport;
use crate::wire::{to_quantity, RpcBlock, RpcLog};

/// Head and log queries against one live connection.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// Header of the latest block.
    async fn latest_header(&self) -> Result<BlockHeader, RpcError>;

    /// All logs emitted by `address` in `[from, to]`, in node order.
    async fn filter_logs(&self, address: Address, from: u64, to: u64)
        -> Result<Vec<RawLog>, RpcError>;

    /// Release the connection.
    async fn close(&self) {}
}

/// `EvmRpc` over any `RpcTransport`; every call is bounded by `call_timeout`.
pub struct EthClient<T> {
    transport: T,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl<T: RpcTransport> EthClient<T> {
    pub fn new(transport: T, call_timeout: Duration) -> Self {
        Self {
            transport,
            call_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<R, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);
        let resp = tokio::time::timeout(self.call_timeout, self.transport.send(req))
            .await
            .map_err(|_| RpcError::Timeout {
                ms: self.call_timeout.as_millis() as u64,
            })??;
        let result = resp.into_result().map_err(RpcError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl<T: RpcTransport> EvmRpc for EthClient<T> {
    async fn latest_header(&self) -> Result<BlockHeader, RpcError> {
        let block: Option<RpcBlock> = self
            .call("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await?;
        let block = block.ok_or_else(|| RpcError::InvalidResponse("latest block is null".into()))?;
        BlockHeader::try_from(block)
    }

    async fn filter_logs(
        &self,
        address: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RpcError> {
        let filter = json!({
            "address": hex_prefixed(address),
            "fromBlock": to_quantity(from),
            "toBlock": to_quantity(to),
        });
        let logs: Vec<RpcLog> = self.call("eth_getLogs", vec![filter]).await?;
        logs.into_iter().map(RawLog::try_from).collect()
    }

    async fn close(&self) {
        self.transport.close().await;
    }
}
