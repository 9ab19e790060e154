//! chainevents-storage: backends for the `DefinitionStore` and `EventStore`
//! traits defined in `chainevents-core`.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - [`postgres`]: PostgreSQL via `sqlx` (production)

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStorage;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresOptions, PostgresStorage};
