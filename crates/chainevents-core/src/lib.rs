//! chainevents-core: shared foundation for the ChainEvents log indexer.
//!
//! # Architecture
//!
//! ```text
//! IndexerService ─┬─ SignatureResolver  (ABI files → EventDefinition rows)
//!                 ├─ LogDecoder         (RawLog + definition → decoded params)
//!                 ├─ ConnectionManager  (dial, probe, reconnect)
//!                 ├─ BlockRangeIndexer  (fetch → decode → one transaction)
//!                 └─ TailMonitor        (cursor → head, forever)
//! ```
//!
//! This crate holds only the types those components exchange.

pub mod abi;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod log;
pub mod param;
pub mod store;

pub use abi::{AbiEvent, AbiInput, EventDefinition};
pub use config::{DatabaseConfig, IndexerConfig, RetryBudget, StartBlock};
pub use cursor::Cursor;
pub use error::{AbiError, ConfigError, DecodeError, StorageError};
pub use event::DecodedEvent;
pub use log::{hex_prefixed, BlockHeader, RawLog};
pub use param::{Component, ParamKind};
pub use store::{DefinitionStore, EventStore};
