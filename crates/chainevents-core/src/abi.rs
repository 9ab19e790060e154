//! ABI JSON shapes and the persisted event definition.
//!
//! `AbiEvent`/`AbiInput` mirror the Solidity compiler's JSON output closely
//! enough to keep component names, which a generic ABI type system drops.

use serde::{Deserialize, Serialize};

/// One input of an ABI event (or one component of a tuple input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInput {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiInput>,
    #[serde(rename = "internalType", default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

impl AbiInput {
    /// Shorthand used heavily in tests and fixtures.
    pub fn new(name: impl Into<String>, ty: impl Into<String>, indexed: bool) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            indexed,
            components: Vec::new(),
            internal_type: None,
        }
    }

    /// Attach tuple components.
    pub fn with_components(mut self, components: Vec<AbiInput>) -> Self {
        self.components = components;
        self
    }
}

/// An ABI entry of `"type": "event"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEvent {
    pub name: String,
    #[serde(rename = "type", default = "event_type")]
    pub ty: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
}

fn event_type() -> String {
    "event".to_string()
}

impl AbiEvent {
    pub fn new(name: impl Into<String>, inputs: Vec<AbiInput>) -> Self {
        Self {
            name: name.into(),
            ty: event_type(),
            anonymous: false,
            inputs,
        }
    }
}

/// A persisted event definition: one row per distinct canonical signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// `0x`-prefixed lowercase keccak-256 of the canonical signature. Unique.
    pub signature_hash: String,
    /// Event name as declared in the ABI.
    pub name: String,
    /// The ABI event object exactly as it was registered.
    pub raw_definition_json: String,
}
