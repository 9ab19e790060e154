//! The active signature table: signature hash → everything the decoder needs.

use std::collections::HashMap;

use alloy_primitives::B256;
use chainevents_core::{
    hex_prefixed, AbiError, AbiEvent, DefinitionStore, ParamKind, StorageError,
};

use crate::resolver::{build_signature, hash_signature};

/// One declared input, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub name: String,
    /// Type string as declared in the ABI.
    pub ty: String,
    pub indexed: bool,
    pub kind: ParamKind,
    /// Position among all inputs, indexed or not.
    pub position: usize,
}

impl InputInfo {
    /// Key in the decoded parameter map: the name, or the position for unnamed inputs.
    pub fn key(&self) -> String {
        if self.name.is_empty() {
            self.position.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// A decodable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignatureInfo {
    pub name: String,
    /// Canonical `Name(type,...)`.
    pub signature: String,
    /// `0x`-prefixed lowercase keccak of `signature`.
    pub hash: String,
    pub inputs: Vec<InputInfo>,
    pub anonymous: bool,
    pub event: AbiEvent,
}

impl EventSignatureInfo {
    pub fn from_event(event: AbiEvent) -> Result<Self, AbiError> {
        let inputs = event
            .inputs
            .iter()
            .enumerate()
            .map(|(position, input)| {
                Ok(InputInfo {
                    name: input.name.clone(),
                    ty: input.ty.clone(),
                    indexed: input.indexed,
                    kind: ParamKind::from_input(input)?,
                    position,
                })
            })
            .collect::<Result<Vec<_>, AbiError>>()?;
        let signature = build_signature(&event);
        Ok(Self {
            name: event.name.clone(),
            hash: hash_signature(&signature),
            signature,
            inputs,
            anonymous: event.anonymous,
            event,
        })
    }

    /// Indexed inputs in declaration order; the k-th maps to topic k+1.
    pub fn indexed_inputs(&self) -> impl Iterator<Item = &InputInfo> {
        self.inputs.iter().filter(|i| i.indexed)
    }

    /// Non-indexed inputs in declaration order; together they form the data tuple.
    pub fn data_inputs(&self) -> impl Iterator<Item = &InputInfo> {
        self.inputs.iter().filter(|i| !i.indexed)
    }
}

/// Lookup table keyed by lowercase `0x` hash.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    by_hash: HashMap<String, EventSignatureInfo>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build directly from ABI events, skipping none. Used by tests and tools.
    pub fn from_events(events: impl IntoIterator<Item = AbiEvent>) -> Result<Self, AbiError> {
        let mut table = Self::new();
        for event in events {
            table.insert(EventSignatureInfo::from_event(event)?);
        }
        Ok(table)
    }

    pub fn insert(&mut self, info: EventSignatureInfo) {
        self.by_hash.insert(info.hash.clone(), info);
    }

    pub fn get(&self, topic0: &B256) -> Option<&EventSignatureInfo> {
        self.by_hash.get(&hex_prefixed(topic0))
    }

    pub fn get_hex(&self, hash: &str) -> Option<&EventSignatureInfo> {
        self.by_hash.get(&hash.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventSignatureInfo> {
        self.by_hash.values()
    }
}

/// Read every persisted definition and build the decoder's lookup table.
///
/// Definitions whose raw JSON no longer parses, whose types are unsupported,
/// or whose recomputed hash disagrees with the stored key are skipped with a
/// warning.
pub async fn build_active_signature_table(
    store: &dyn DefinitionStore,
) -> Result<SignatureTable, StorageError> {
    let mut table = SignatureTable::new();
    for definition in store.load_definitions().await? {
        let event: AbiEvent = match serde_json::from_str(&definition.raw_definition_json) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(hash = %definition.signature_hash, error = %e, "stored definition does not parse");
                continue;
            }
        };
        let info = match EventSignatureInfo::from_event(event) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(hash = %definition.signature_hash, error = %e, "stored definition is not decodable");
                continue;
            }
        };
        if !info.hash.eq_ignore_ascii_case(&definition.signature_hash) {
            tracing::warn!(
                stored = %definition.signature_hash,
                computed = %info.hash,
                signature = %info.signature,
                "stored definition hash mismatch"
            );
            continue;
        }
        table.insert(info);
    }
    tracing::info!(events = table.len(), "signature table built");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainevents_core::{AbiInput, EventDefinition};
    use chainevents_storage::MemoryStorage;

    fn transfer() -> AbiEvent {
        AbiEvent::new(
            "Transfer",
            vec![
                AbiInput::new("from", "address", true),
                AbiInput::new("to", "address", true),
                AbiInput::new("value", "uint256", false),
            ],
        )
    }

    #[test]
    fn info_partitions_inputs_in_order() {
        let info = EventSignatureInfo::from_event(transfer()).unwrap();
        let indexed: Vec<_> = info.indexed_inputs().map(|i| i.name.as_str()).collect();
        let data: Vec<_> = info.data_inputs().map(|i| i.name.as_str()).collect();
        assert_eq!(indexed, ["from", "to"]);
        assert_eq!(data, ["value"]);
        assert_eq!(info.inputs[2].kind, ParamKind::Uint(256));
        assert_eq!(info.inputs[2].position, 2);
    }

    #[test]
    fn unnamed_inputs_are_keyed_by_position() {
        let event = AbiEvent::new(
            "Pair",
            vec![
                AbiInput::new("", "uint256", false),
                AbiInput::new("amount", "uint256", false),
                AbiInput::new("", "address", true),
            ],
        );
        let info = EventSignatureInfo::from_event(event).unwrap();
        let keys: Vec<_> = info.inputs.iter().map(InputInfo::key).collect();
        assert_eq!(keys, ["0", "amount", "2"]);
    }

    #[test]
    fn lookup_by_topic_and_hex() {
        let table = SignatureTable::from_events([transfer()]).unwrap();
        let topic: B256 = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            .parse()
            .unwrap();
        assert_eq!(table.get(&topic).unwrap().name, "Transfer");
        assert!(table
            .get_hex("0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF")
            .is_some());
        assert!(table.get(&B256::ZERO).is_none());
    }

    #[tokio::test]
    async fn table_skips_corrupt_and_mismatched_rows() {
        let store = MemoryStorage::new();
        let good = serde_json::to_string(&transfer()).unwrap();
        store
            .insert_definition_if_absent(&EventDefinition {
                signature_hash: hash_signature("Transfer(address,address,uint256)"),
                name: "Transfer".into(),
                raw_definition_json: good.clone(),
            })
            .await
            .unwrap();
        store
            .insert_definition_if_absent(&EventDefinition {
                signature_hash: "0x01".into(),
                name: "Transfer".into(),
                raw_definition_json: good,
            })
            .await
            .unwrap();
        store
            .insert_definition_if_absent(&EventDefinition {
                signature_hash: "0x02".into(),
                name: "Broken".into(),
                raw_definition_json: "{".into(),
            })
            .await
            .unwrap();

        let table = build_active_signature_table(&store).await.unwrap();
        assert_eq!(table.len(), 1);
    }
}
