//! Error types for the indexing pipeline.

use chainevents_abi::RegisterError;
use chainevents_core::{AbiError, ConfigError, StorageError};
use chainevents_rpc::RpcError;
use thiserror::Error;

/// Errors surfaced by the indexer, range scanner and service.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("fetching logs for blocks {from}..={to} failed after {attempts} attempts: {source}")]
    FetchExhausted {
        from: u64,
        to: u64,
        attempts: u32,
        #[source]
        source: RpcError,
    },
}

impl From<RegisterError> for IndexerError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Abi(e) => Self::Abi(e),
            RegisterError::Storage(e) => Self::Storage(e),
        }
    }
}

impl IndexerError {
    /// Returns `true` if the process cannot continue (bad config, endpoint gone).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Rpc(RpcError::ConnectExhausted { .. })
        )
    }
}
