//! Node response shapes for `eth_getLogs` / `eth_getBlockByNumber`, and their
//! conversion into the typed core records.

use std::str::FromStr;

use alloy_primitives::{Bytes, B256};
use chainevents_core::{BlockHeader, RawLog};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// A log as returned by `eth_getLogs` (all quantities hex-encoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    pub block_number: Option<String>,
    pub block_hash: Option<String>,
    pub transaction_hash: Option<String>,
    pub transaction_index: Option<String>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

impl TryFrom<RpcLog> for RawLog {
    type Error = RpcError;

    fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
        Ok(RawLog {
            address: parse_hex(&log.address, "address")?,
            topics: log
                .topics
                .iter()
                .map(|t| parse_hex::<B256>(t, "topic"))
                .collect::<Result<_, _>>()?,
            data: parse_hex::<Bytes>(if log.data.is_empty() { "0x" } else { &log.data }, "data")?,
            block_number: parse_quantity(required(&log.block_number, "blockNumber")?)?,
            block_hash: parse_hex(required(&log.block_hash, "blockHash")?, "blockHash")?,
            tx_hash: parse_hex(required(&log.transaction_hash, "transactionHash")?, "transactionHash")?,
            tx_index: parse_quantity(required(&log.transaction_index, "transactionIndex")?)?,
            log_index: parse_quantity(required(&log.log_index, "logIndex")?)?,
            removed: log.removed,
        })
    }
}

/// The header fields of an `eth_getBlockByNumber` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
    pub number: Option<String>,
    pub hash: Option<String>,
}

impl TryFrom<RpcBlock> for BlockHeader {
    type Error = RpcError;

    fn try_from(block: RpcBlock) -> Result<Self, Self::Error> {
        Ok(BlockHeader {
            number: parse_quantity(required(&block.number, "number")?)?,
            hash: parse_hex(required(&block.hash, "hash")?, "hash")?,
        })
    }
}

/// Parse a hex quantity (`0x1a`) into `u64`.
pub fn parse_quantity(s: &str) -> Result<u64, RpcError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity '{s}': {e}")))
}

/// Encode a block number as a hex quantity.
pub fn to_quantity(n: u64) -> String {
    format!("{n:#x}")
}

fn parse_hex<T>(s: &str, field: &str) -> Result<T, RpcError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| RpcError::InvalidResponse(format!("bad {field} '{s}': {e}")))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, RpcError> {
    value
        .as_deref()
        .ok_or_else(|| RpcError::InvalidResponse(format!("missing {field} (pending log?)")))
}
