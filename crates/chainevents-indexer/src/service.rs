//! `IndexerService`: the one context object built at startup.
//!
//! Owns the configuration, both stores and the connection manager, and hands
//! each component what it needs. Nothing in the pipeline is process-global.

use std::sync::Arc;

use chainevents_abi::{build_active_signature_table, load_and_register, LoadSummary, LogDecoder, RegisterError};
use chainevents_core::{AbiError, DefinitionStore, EventStore, IndexerConfig};
use chainevents_rpc::ConnectionManager;

use crate::error::IndexerError;
use crate::monitor::TailMonitor;
use crate::range::BlockRangeIndexer;

pub struct IndexerService {
    config: IndexerConfig,
    definitions: Arc<dyn DefinitionStore>,
    events: Arc<dyn EventStore>,
    connection: ConnectionManager,
}

impl IndexerService {
    /// Validate `config` and set up a connection manager for its endpoint.
    ///
    /// Fails without touching the network on a bad URL scheme or contract.
    pub fn new(
        config: IndexerConfig,
        definitions: Arc<dyn DefinitionStore>,
        events: Arc<dyn EventStore>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let connection = ConnectionManager::from_config(&config)?;
        Ok(Self::with_connection(config, definitions, events, connection))
    }

    /// Same as `new` with a caller-supplied connection manager.
    pub fn with_connection(
        config: IndexerConfig,
        definitions: Arc<dyn DefinitionStore>,
        events: Arc<dyn EventStore>,
        connection: ConnectionManager,
    ) -> Self {
        Self {
            config,
            definitions,
            events,
            connection,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Register every event found under the ABI directory.
    ///
    /// A missing directory is logged and yields `None`: the indexer keeps
    /// running with whatever definitions are already stored.
    pub async fn load_abis(&self) -> Result<Option<LoadSummary>, IndexerError> {
        match load_and_register(&self.config.abi_dir, self.definitions.as_ref()).await {
            Ok(summary) => Ok(Some(summary)),
            Err(RegisterError::Abi(AbiError::MissingDirectory { path })) => {
                tracing::warn!(
                    dir = %path.display(),
                    "ABI directory not found; unknown events will be stored undecoded"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Build the decoder from stored definitions and assemble the monitor.
    pub async fn into_monitor(self) -> Result<TailMonitor, IndexerError> {
        let table = build_active_signature_table(self.definitions.as_ref()).await?;
        if table.is_empty() {
            tracing::warn!("no event definitions loaded; every log will be stored as unknown");
        }
        let indexer = BlockRangeIndexer::new(
            self.config.contract()?,
            LogDecoder::new(table),
            self.events,
            self.config.fetch_retry,
            self.config.max_block_range,
        );
        Ok(TailMonitor::new(
            self.connection,
            indexer,
            self.config.start_block,
            self.config.finality_lag,
            self.config.poll_interval,
            self.config.connect_retry.delay,
        ))
    }

    /// Load ABIs, then index forever (or until `shutdown` resolves).
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), IndexerError>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(
            rpc = %self.connection.endpoint().redacted(),
            contract = %self.config.contract_address,
            abi_dir = %self.config.abi_dir.display(),
            start_block = ?self.config.start_block,
            finality_lag = self.config.finality_lag,
            max_block_range = self.config.max_block_range,
            "starting indexer service"
        );
        self.load_abis().await?;
        let mut monitor = self.into_monitor().await?;
        monitor.run_until(shutdown).await
    }
}
