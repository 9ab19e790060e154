//! Tail Monitor: resume from the cursor, catch up, then follow the head.
//!
//! # Startup
//! `from` is cursor + 1, or the configured start block on a fresh store.
//! If `from` is past the confirmed head the watermark is `from - 1`;
//! otherwise `[from, confirmed_head]` is caught up first. A failed head fetch
//! reconnects and tries again until the connect budget is spent.
//!
//! # Loop
//! Poll the head every `poll_interval`. When the confirmed head is past the
//! watermark, scan the gap. A head-fetch failure triggers a reconnect; a
//! range failure is logged and retried on the next tick.
//!
//! The watermark only moves after a chunk commits, so it never runs ahead
//! of the persisted cursor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chainevents_core::{StartBlock, StorageError};
use chainevents_rpc::{ConnectionManager, EvmRpc, RpcError};

use crate::error::IndexerError;
use crate::range::{chunks, BlockRangeIndexer};

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No new confirmed blocks.
    Idle { head: u64 },
    /// Gap scanned; the watermark is now `to`.
    Indexed { from: u64, to: u64, events: usize },
    /// Some chunks failed; the watermark stopped at `watermark`.
    Failed { watermark: u64 },
    /// The head fetch failed and the connection was replaced.
    Reconnected,
}

pub struct TailMonitor {
    connection: ConnectionManager,
    indexer: BlockRangeIndexer,
    start_block: StartBlock,
    finality_lag: u64,
    poll_interval: Duration,
    retry_delay: Duration,
    watermark: Option<u64>,
}

impl TailMonitor {
    pub fn new(
        connection: ConnectionManager,
        indexer: BlockRangeIndexer,
        start_block: StartBlock,
        finality_lag: u64,
        poll_interval: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            connection,
            indexer,
            start_block,
            finality_lag,
            poll_interval,
            retry_delay,
            watermark: None,
        }
    }

    /// Last block known to be committed, once `start` has run.
    pub fn watermark(&self) -> Option<u64> {
        self.watermark
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    async fn client(&mut self) -> Result<Arc<dyn EvmRpc>, IndexerError> {
        match self.connection.client() {
            Some(client) => Ok(client),
            None => Ok(self.connection.connect().await?),
        }
    }

    /// Latest head minus the finality lag.
    async fn confirmed_head(&self, rpc: &dyn EvmRpc) -> Result<(u64, u64), IndexerError> {
        let head = rpc.latest_header().await?.number;
        Ok((head, head.saturating_sub(self.finality_lag)))
    }

    /// Fetch the head, reconnecting after each failure until the connect
    /// budget is spent.
    async fn startup_head(&mut self) -> Result<(u64, u64), IndexerError> {
        let attempts = self.connection.retry().attempts();
        let mut attempt = 0;
        loop {
            let rpc = self.client().await?;
            let err = match self.confirmed_head(rpc.as_ref()).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            attempt += 1;
            if attempt >= attempts {
                tracing::error!(attempts, error = %err, "head fetch failed during startup, giving up");
                return Err(RpcError::ConnectExhausted {
                    attempts,
                    last: err.to_string(),
                }
                .into());
            }
            tracing::warn!(attempt, max = attempts, error = %err, "head fetch failed during startup");
            self.connection.mark_failed();
            tokio::time::sleep(self.retry_delay).await;
            self.connection.reconnect().await?;
        }
    }

    /// Connect, derive the starting point and catch up to the confirmed head.
    ///
    /// Only connection exhaustion and storage read failures are errors; a
    /// failed catch-up leaves the watermark at the last committed chunk.
    pub async fn start(&mut self) -> Result<u64, IndexerError> {
        let (head, confirmed) = self.startup_head().await?;

        let cursor = self.indexer.store().load_cursor().await?;
        let from = match (cursor, self.start_block) {
            (Some(cursor), _) => cursor.next_block(),
            (None, StartBlock::Number(n)) => n,
            (None, StartBlock::Head) => confirmed,
        };
        tracing::info!(
            cursor = cursor.map(|c| c.count),
            from,
            head,
            confirmed,
            finality_lag = self.finality_lag,
            "starting tail monitor"
        );

        let watermark = from.saturating_sub(1);
        self.watermark = Some(watermark);
        if from > confirmed {
            tracing::info!(watermark, "already caught up");
            return Ok(watermark);
        }

        let rpc = self.client().await?;
        if let Err(e) = self.scan(rpc.as_ref(), from, confirmed).await {
            tracing::error!(error = %e, watermark = ?self.watermark, "catch-up incomplete, continuing in tail mode");
        } else {
            tracing::info!(to = confirmed, "catch-up complete");
        }
        Ok(self.watermark.unwrap_or(watermark))
    }

    /// Scan `[from, to]` chunk by chunk, moving the watermark after each commit.
    async fn scan(&mut self, rpc: &dyn EvmRpc, from: u64, to: u64) -> Result<usize, IndexerError> {
        let mut stored = 0;
        for (lo, hi) in chunks(from, to, self.indexer.max_block_range()) {
            match self.indexer.index_chunk(rpc, lo, hi).await {
                Ok(n) => {
                    stored += n;
                    self.watermark = Some(hi);
                }
                Err(IndexerError::Storage(StorageError::CursorRegression { current, .. })) => {
                    tracing::warn!(current, "persisted cursor is ahead of watermark, resyncing");
                    self.watermark = Some(current);
                    return Err(StorageError::CursorRegression {
                        current,
                        requested: hi,
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stored)
    }

    /// One iteration of the loop, without the poll sleep.
    pub async fn tick(&mut self) -> Result<Tick, IndexerError> {
        if self.watermark.is_none() {
            self.start().await?;
        }
        let rpc = self.client().await?;

        let (head, confirmed) = match self.confirmed_head(rpc.as_ref()).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, delay_ms = self.retry_delay.as_millis() as u64, "head fetch failed, reconnecting");
                self.connection.mark_failed();
                tokio::time::sleep(self.retry_delay).await;
                self.connection.reconnect().await?;
                return Ok(Tick::Reconnected);
            }
        };

        let watermark = self.watermark.unwrap_or(0);
        if confirmed <= watermark {
            tracing::debug!(head, confirmed, watermark, "no new confirmed blocks");
            return Ok(Tick::Idle { head });
        }

        let from = watermark + 1;
        match self.scan(rpc.as_ref(), from, confirmed).await {
            Ok(events) => Ok(Tick::Indexed {
                from,
                to: confirmed,
                events,
            }),
            Err(e) => {
                let watermark = self.watermark.unwrap_or(0);
                tracing::error!(from, to = confirmed, watermark, error = %e, "range scan failed, will retry");
                Ok(Tick::Failed { watermark })
            }
        }
    }

    /// Run forever. Returns only if reconnecting is exhausted or storage is unreachable at startup.
    pub async fn run(&mut self) -> Result<(), IndexerError> {
        self.start().await?;
        loop {
            if let Err(e) = self.tick().await {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::error!(error = %e, "tick failed, retrying after poll interval");
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// `run` until `shutdown` resolves.
    ///
    /// Dropping mid-range is safe: an uncommitted transaction rolls back.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), IndexerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.run() => res,
            _ = shutdown => {
                tracing::info!("shutdown requested");
                Ok(())
            }
        }
    }
}
