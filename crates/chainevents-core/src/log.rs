//! Raw chain data as delivered by the RPC layer.

use alloy_primitives::{Address, Bytes, B256};

/// A contract log exactly as the node reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Contract that emitted the log.
    pub address: Address,
    /// Up to four topics; topic 0 is the event signature hash for non-anonymous events.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed parameters.
    pub data: Bytes,
    pub block_number: u64,
    pub block_hash: B256,
    pub tx_hash: B256,
    /// Position of the transaction in the block.
    pub tx_index: u64,
    /// Position of the log in the block's combined log list.
    pub log_index: u64,
    /// `true` if the log was invalidated by a reorg.
    pub removed: bool,
}

impl RawLog {
    /// Topic 0, if present.
    pub fn signature_topic(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// The part of a block header the indexer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
}

/// `0x`-prefixed lowercase hex.
pub fn hex_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_topic_is_first() {
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![B256::repeat_byte(0xaa), B256::repeat_byte(0xbb)],
            data: Bytes::new(),
            block_number: 1,
            block_hash: B256::ZERO,
            tx_hash: B256::ZERO,
            tx_index: 0,
            log_index: 0,
            removed: false,
        };
        assert_eq!(log.signature_topic(), Some(&B256::repeat_byte(0xaa)));
    }

    #[test]
    fn hex_prefixed_is_lowercase() {
        assert_eq!(hex_prefixed([0xAB, 0x01]), "0xab01");
    }
}
