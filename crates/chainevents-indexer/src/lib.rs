//! chainevents-indexer: drives logs from the node into the store.
//!
//! - [`range::BlockRangeIndexer`]: one `[from, to]` chunk at a time, fetch →
//!   decode → single transaction with the cursor.
//! - [`monitor::TailMonitor`]: startup catch-up, then follow the confirmed head.
//! - [`service::IndexerService`]: the context object that wires them up.

pub mod error;
pub mod monitor;
pub mod range;
pub mod service;

pub use error::IndexerError;
pub use monitor::{TailMonitor, Tick};
pub use range::{chunks, BlockRangeIndexer};
pub use service::IndexerService;
