//! The persisted, decoded form of one observed log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row per `(tx_hash, log_index)`.
///
/// Re-observing the same key overwrites every other field (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub tx_hash: String,
    pub tx_index: u64,
    pub block_number: u64,
    pub block_hash: String,
    pub log_index: u64,
    pub removed: bool,
    /// Checksummed contract address.
    pub contract_address: String,
    /// Topic 0 as hex, whether or not it matched a definition. Empty for topic-less logs.
    pub event_signature_hash: String,
    /// `None` when the signature is not in the loaded set.
    pub event_name: Option<String>,
    pub event_full_signature: Option<String>,
    /// Topics 1.. in order.
    pub other_topics: Vec<String>,
    /// Hex of the undecoded data blob, no `0x` prefix.
    pub raw_data: String,
    /// Parameter name → decoded value. Empty for unknown events.
    pub decoded_params: Map<String, Value>,
    pub insert_time: DateTime<Utc>,
}

impl DecodedEvent {
    /// `true` if the log matched a known definition.
    pub fn is_known(&self) -> bool {
        self.event_name.is_some()
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.decoded_params.get(name)
    }
}
