//! Indexer cursor: the persisted watermark.

use serde::{Deserialize, Serialize};

/// Last block whose logs are durably stored (inclusive).
///
/// Readers may rely on `count` as a consistency watermark: every matching log
/// at or below it has been decoded and committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub count: u64,
}

impl Cursor {
    pub fn new(count: u64) -> Self {
        Self { count }
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.count + 1
    }

    /// Returns `true` if moving to `to` keeps the cursor monotonic.
    pub fn can_advance_to(&self, to: u64) -> bool {
        to >= self.count
    }
}
