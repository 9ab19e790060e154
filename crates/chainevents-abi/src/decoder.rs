//! Log Decoder: raw log + matched definition → `DecodedEvent`.
//!
//! # Topic layout
//! Topic 0 is the signature hash; the k-th indexed input sits in topic k+1.
//! Value types (address, intN, uintN, bool, bytesN) are recoverable from
//! their 32-byte word. Reference types (string, bytes, arrays, tuples) are
//! stored as the keccak of their encoding, so the topic itself is kept.
//!
//! # Data layout
//! Non-indexed inputs are ABI-encoded together as one parameter sequence and
//! decoded with alloy-dyn-abi.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, I256, U256};
use chainevents_core::{hex_prefixed, DecodeError, DecodedEvent, ParamKind, RawLog};
use serde_json::{Map, Value};

use crate::normalizer;
use crate::table::{EventSignatureInfo, SignatureTable};

/// Decodes logs against a fixed signature table.
///
/// Cheap to clone; the table is shared.
#[derive(Debug, Clone, Default)]
pub struct LogDecoder {
    table: Arc<SignatureTable>,
}

impl LogDecoder {
    pub fn new(table: SignatureTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// Decode one log into its storable form.
    ///
    /// Never fails: unknown events keep their raw topics and data with empty
    /// params, and parameter-level faults are logged and skipped.
    pub fn decode(&self, log: &RawLog) -> DecodedEvent {
        let info = log.signature_topic().and_then(|t| self.table.get(t));
        let decoded_params = match info {
            Some(info) => decode_params(info, log),
            None => Map::new(),
        };

        DecodedEvent {
            tx_hash: hex_prefixed(log.tx_hash),
            tx_index: log.tx_index,
            block_number: log.block_number,
            block_hash: hex_prefixed(log.block_hash),
            log_index: log.log_index,
            removed: log.removed,
            contract_address: log.address.to_checksum(None),
            event_signature_hash: log.signature_topic().map(hex_prefixed).unwrap_or_default(),
            event_name: info.map(|i| i.name.clone()),
            event_full_signature: info.map(|i| i.signature.clone()),
            other_topics: log.topics.iter().skip(1).map(hex_prefixed).collect(),
            raw_data: hex::encode(&log.data),
            decoded_params,
            insert_time: chrono::Utc::now(),
        }
    }
}

/// Decode the parameters of a log already matched to `info`.
pub fn decode_params(info: &EventSignatureInfo, log: &RawLog) -> Map<String, Value> {
    let mut params = Map::new();

    // Missing topics (truncated or anonymous logs) are skipped silently.
    for (k, input) in info.indexed_inputs().enumerate() {
        if let Some(topic) = log.topics.get(k + 1) {
            params.insert(input.key(), decode_topic(topic, &input.kind));
        }
    }

    let data_inputs: Vec<_> = info.data_inputs().collect();
    if data_inputs.is_empty() {
        return params;
    }
    let kinds: Vec<&ParamKind> = data_inputs.iter().map(|i| &i.kind).collect();
    match decode_data(&log.data, &kinds) {
        Ok(values) => {
            for (input, value) in data_inputs.iter().zip(values) {
                params.insert(input.key(), normalizer::normalize(value, &input.kind));
            }
        }
        Err(e) => {
            tracing::warn!(
                event = %info.signature,
                tx = %log.tx_hash,
                log_index = log.log_index,
                error = %e,
                "failed to decode log data; non-indexed params left empty"
            );
        }
    }
    params
}

/// Decode one indexed topic word.
pub fn decode_topic(topic: &B256, kind: &ParamKind) -> Value {
    let word = topic.as_slice();
    if kind.is_hashed_in_topic() {
        return Value::String(hex_prefixed(word));
    }
    match kind {
        ParamKind::Address => Value::String(Address::from_slice(&word[12..]).to_checksum(None)),
        ParamKind::Uint(_) => Value::String(U256::from_be_slice(word).to_string()),
        ParamKind::Int(_) => Value::String(I256::from_raw(U256::from_be_slice(word)).to_string()),
        ParamKind::Bool => Value::Bool(word[31] == 1),
        ParamKind::FixedBytes(n) => Value::String(hex_prefixed(&word[..usize::from(*n).min(32)])),
        _ => Value::String(hex_prefixed(word)),
    }
}

/// ABI-decode `data` as the sequence of `kinds`.
pub fn decode_data(data: &[u8], kinds: &[&ParamKind]) -> Result<Vec<DynSolValue>, DecodeError> {
    let ty = DynSolType::Tuple(kinds.iter().map(|k| to_dyn_type(k)).collect());
    let decoded = ty
        .abi_decode_sequence(data)
        .map_err(|e| DecodeError::AbiDecodeFailed {
            reason: e.to_string(),
        })?;
    match decoded {
        DynSolValue::Tuple(values) if values.len() == kinds.len() => Ok(values),
        other => Err(DecodeError::TypeMismatch {
            param: "data".into(),
            expected: format!("tuple of {} values, got {other:?}", kinds.len()),
        }),
    }
}

/// Map the closed kind set onto alloy's dynamic type.
pub fn to_dyn_type(kind: &ParamKind) -> DynSolType {
    match kind {
        ParamKind::Address => DynSolType::Address,
        ParamKind::Int(bits) => DynSolType::Int(usize::from(*bits)),
        ParamKind::Uint(bits) => DynSolType::Uint(usize::from(*bits)),
        ParamKind::Bool => DynSolType::Bool,
        ParamKind::String => DynSolType::String,
        ParamKind::Bytes => DynSolType::Bytes,
        ParamKind::FixedBytes(n) => DynSolType::FixedBytes(usize::from(*n)),
        ParamKind::Tuple(members) => {
            DynSolType::Tuple(members.iter().map(|m| to_dyn_type(&m.kind)).collect())
        }
        ParamKind::Array { elem, len: None } => DynSolType::Array(Box::new(to_dyn_type(elem))),
        ParamKind::Array {
            elem,
            len: Some(n),
        } => DynSolType::FixedArray(Box::new(to_dyn_type(elem)), *n),
    }
}
