//! In-memory storage backend.
//!
//! Same semantics as the Postgres backend (idempotent definitions, keyed
//! event upsert, all-or-nothing range commits) without persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use chainevents_core::{
    Cursor, DecodedEvent, DefinitionStore, EventDefinition, EventStore, StorageError,
};

#[derive(Default)]
struct Inner {
    definitions: Vec<EventDefinition>,
    events: HashMap<(String, u64), DecodedEvent>,
    cursor: Option<u64>,
}

/// In-memory storage. All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All stored events ordered by block number, then log index.
    pub fn events(&self) -> Vec<DecodedEvent> {
        let mut events: Vec<_> = self.lock().events.values().cloned().collect();
        events.sort_by_key(|e| (e.block_number, e.log_index));
        events
    }

    pub fn event(&self, tx_hash: &str, log_index: u64) -> Option<DecodedEvent> {
        self.lock()
            .events
            .get(&(tx_hash.to_string(), log_index))
            .cloned()
    }

    /// Current cursor value without going through the async trait.
    pub fn cursor(&self) -> Option<u64> {
        self.lock().cursor
    }
}

#[async_trait]
impl DefinitionStore for MemoryStorage {
    async fn insert_definition_if_absent(
        &self,
        definition: &EventDefinition,
    ) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        if inner
            .definitions
            .iter()
            .any(|d| d.signature_hash == definition.signature_hash)
        {
            return Ok(false);
        }
        inner.definitions.push(definition.clone());
        Ok(true)
    }

    async fn load_definitions(&self) -> Result<Vec<EventDefinition>, StorageError> {
        Ok(self.lock().definitions.clone())
    }
}

#[async_trait]
impl EventStore for MemoryStorage {
    async fn load_cursor(&self) -> Result<Option<Cursor>, StorageError> {
        Ok(self.lock().cursor.map(Cursor::new))
    }

    async fn commit_range(&self, events: &[DecodedEvent], to: u64) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if let Some(current) = inner.cursor {
            if !Cursor::new(current).can_advance_to(to) {
                return Err(StorageError::CursorRegression {
                    current,
                    requested: to,
                });
            }
        }
        for event in events {
            let key = (event.tx_hash.clone(), event.log_index);
            let mut row = event.clone();
            if let Some(existing) = inner.events.get(&key) {
                row.insert_time = existing.insert_time;
            }
            inner.events.insert(key, row);
        }
        inner.cursor = Some(to);
        Ok(())
    }

    async fn reset_cursor(&self, block: u64) -> Result<(), StorageError> {
        self.lock().cursor = Some(block);
        Ok(())
    }

    async fn event_count(&self) -> Result<u64, StorageError> {
        Ok(self.lock().events.len() as u64)
    }
}
