//! Block-Range Indexer: exactly-once processing of `[from, to]`.
//!
//! Per chunk:
//! 1. fetch the contract's logs, retrying only the fetch
//! 2. decode every log in (block, log index) order
//! 3. upsert events and move the cursor to `to` in one transaction
//!
//! A chunk with no logs still commits, so empty ranges are never rescanned.
//! If any step fails nothing of the chunk is persisted.

use std::sync::Arc;

use alloy_primitives::Address;
use chainevents_abi::LogDecoder;
use chainevents_core::{EventStore, RawLog, RetryBudget};
use chainevents_rpc::{EvmRpc, RpcError};

use crate::error::IndexerError;

/// Split `[from, to]` into consecutive inclusive chunks of at most `max` blocks.
pub fn chunks(from: u64, to: u64, max: u64) -> impl Iterator<Item = (u64, u64)> {
    let max = max.max(1);
    let mut next = Some(from).filter(|&f| f <= to);
    std::iter::from_fn(move || {
        let start = next?;
        let end = start.saturating_add(max - 1).min(to);
        next = end.checked_add(1).filter(|&n| n <= to);
        Some((start, end))
    })
}

pub struct BlockRangeIndexer {
    contract: Address,
    decoder: LogDecoder,
    store: Arc<dyn EventStore>,
    fetch_retry: RetryBudget,
    max_block_range: u64,
}

impl BlockRangeIndexer {
    pub fn new(
        contract: Address,
        decoder: LogDecoder,
        store: Arc<dyn EventStore>,
        fetch_retry: RetryBudget,
        max_block_range: u64,
    ) -> Self {
        Self {
            contract,
            decoder,
            store,
            fetch_retry,
            max_block_range,
        }
    }

    pub fn max_block_range(&self) -> u64 {
        self.max_block_range
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Index `[from, to]` chunk by chunk. Stops at the first failed chunk;
    /// chunks committed before it stay committed.
    ///
    /// Returns the number of events stored.
    pub async fn index_range(
        &self,
        rpc: &dyn EvmRpc,
        from: u64,
        to: u64,
    ) -> Result<usize, IndexerError> {
        let mut stored = 0;
        for (lo, hi) in chunks(from, to, self.max_block_range) {
            stored += self.index_chunk(rpc, lo, hi).await?;
        }
        Ok(stored)
    }

    /// Process one chunk; `to - from` must not exceed the node's range limit.
    pub async fn index_chunk(
        &self,
        rpc: &dyn EvmRpc,
        from: u64,
        to: u64,
    ) -> Result<usize, IndexerError> {
        tracing::info!(from, to, "scanning range");
        let mut logs = self.fetch_with_retry(rpc, from, to).await?;
        logs.sort_by_key(|l| (l.block_number, l.log_index));

        let events: Vec<_> = logs.iter().map(|log| self.decoder.decode(log)).collect();
        let removed = events.iter().filter(|e| e.removed).count();
        let unknown = events.iter().filter(|e| !e.is_known()).count();

        self.store.commit_range(&events, to).await?;
        tracing::info!(from, to, stored = events.len(), unknown, removed, "range committed");
        Ok(events.len())
    }

    async fn fetch_with_retry(
        &self,
        rpc: &dyn EvmRpc,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, IndexerError> {
        let attempts = self.fetch_retry.attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match rpc.filter_logs(self.contract, from, to).await {
                Ok(logs) => return Ok(logs),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    tracing::warn!(
                        attempt,
                        max = attempts,
                        from,
                        to,
                        delay_ms = self.fetch_retry.delay.as_millis() as u64,
                        error = %e,
                        "log fetch failed, retrying"
                    );
                    tokio::time::sleep(self.fetch_retry.delay).await;
                }
                Err(e) => return Err(exhausted(from, to, attempt, e)),
            }
        }
    }
}

fn exhausted(from: u64, to: u64, attempts: u32, source: RpcError) -> IndexerError {
    tracing::error!(from, to, attempts, error = %source, "log fetch failed");
    IndexerError::FetchExhausted {
        from,
        to,
        attempts,
        source,
    }
}
