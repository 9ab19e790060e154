//! Persistence seams.
//!
//! The Signature Resolver writes through `DefinitionStore`; the Block-Range
//! Indexer is the only writer behind `EventStore`. Backends live in
//! `chainevents-storage`.

use async_trait::async_trait;

use crate::abi::EventDefinition;
use crate::cursor::Cursor;
use crate::error::StorageError;
use crate::event::DecodedEvent;

/// Storage for ABI event definitions.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Insert the definition unless a row with the same signature hash exists.
    ///
    /// Returns `true` if a row was inserted.
    async fn insert_definition_if_absent(
        &self,
        definition: &EventDefinition,
    ) -> Result<bool, StorageError>;

    /// All persisted definitions, in insertion order.
    async fn load_definitions(&self) -> Result<Vec<EventDefinition>, StorageError>;
}

/// Storage for decoded events and the cursor.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The persisted cursor, if any range was ever committed.
    async fn load_cursor(&self) -> Result<Option<Cursor>, StorageError>;

    /// Upsert `events` keyed by `(tx_hash, log_index)` and move the cursor to
    /// `to`, in one transaction. Either everything is durable or nothing is.
    ///
    /// Fails with `StorageError::CursorRegression` if `to` is below the
    /// persisted cursor.
    async fn commit_range(&self, events: &[DecodedEvent], to: u64) -> Result<(), StorageError>;

    /// Operator reset: set the cursor to `block` unconditionally.
    async fn reset_cursor(&self, block: u64) -> Result<(), StorageError>;

    /// Number of stored event rows.
    async fn event_count(&self) -> Result<u64, StorageError>;
}
