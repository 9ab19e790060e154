//! Converts alloy `DynSolValue` → JSON, guided by the declared `ParamKind`.
//!
//! The kind carries component names that the decoded value has lost, so
//! tuples come out as objects keyed by those names.
//!
//! Rendering rules:
//! - integers of any width → decimal strings
//! - addresses → EIP-55 checksummed hex
//! - `bytes`, `bytesN`, `function` → `0x` hex
//! - tuples → objects (unnamed members keyed by position)
//! - an array of tuples holding exactly one element → that element's object
//! - `uint8[4]` → one `0x` hex string of its four bytes

use alloy_dyn_abi::DynSolValue;
use chainevents_core::{hex_prefixed, Component, ParamKind};
use serde_json::{Map, Value};

/// Normalize a value decoded for a parameter of kind `kind`.
pub fn normalize(value: DynSolValue, kind: &ParamKind) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::FixedBytes(word, size) => Value::String(hex_prefixed(&word[..size.min(32)])),
        DynSolValue::Function(f) => Value::String(hex_prefixed(f.as_slice())),
        DynSolValue::Bytes(b) => Value::String(hex_prefixed(b)),
        DynSolValue::String(s) => Value::String(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => normalize_array(items, kind),
        DynSolValue::Tuple(fields) => {
            let components = match kind {
                ParamKind::Tuple(members) => members.as_slice(),
                _ => &[],
            };
            Value::Object(normalize_tuple(fields, components))
        }
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{other:?}")),
    }
}

fn normalize_array(items: Vec<DynSolValue>, kind: &ParamKind) -> Value {
    let elem = match kind {
        ParamKind::Array { elem, .. } => elem.as_ref(),
        other => other,
    };
    if is_four_byte_array(kind) {
        if let Some(bytes) = small_uints(&items) {
            return Value::String(hex_prefixed(bytes));
        }
    }
    let mut out: Vec<Value> = items.into_iter().map(|v| normalize(v, elem)).collect();
    if out.len() == 1 && matches!(elem, ParamKind::Tuple(_)) {
        return out.remove(0);
    }
    Value::Array(out)
}

fn is_four_byte_array(kind: &ParamKind) -> bool {
    matches!(kind, ParamKind::Array { elem, len: Some(4) } if **elem == ParamKind::Uint(8))
}

fn small_uints(items: &[DynSolValue]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|v| match v {
            DynSolValue::Uint(u, _) => u8::try_from(*u).ok(),
            _ => None,
        })
        .collect()
}

fn normalize_tuple(fields: Vec<DynSolValue>, components: &[Component]) -> Map<String, Value> {
    let mut map = Map::new();
    for (i, field) in fields.into_iter().enumerate() {
        match components.get(i) {
            Some(c) if !c.name.is_empty() => {
                map.insert(c.name.clone(), normalize(field, &c.kind));
            }
            Some(c) => {
                map.insert(i.to_string(), normalize(field, &c.kind));
            }
            None => {
                map.insert(i.to_string(), normalize(field, &ParamKind::Bytes));
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256, U256};
    use serde_json::json;

    fn item_kind() -> ParamKind {
        ParamKind::Tuple(vec![
            Component {
                name: "id".into(),
                kind: ParamKind::Uint(256),
            },
            Component {
                name: "owner".into(),
                kind: ParamKind::Address,
            },
        ])
    }

    fn item(id: u64, owner: Address) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(id), 256),
            DynSolValue::Address(owner),
        ])
    }

    #[test]
    fn integers_become_decimal_strings() {
        let big = U256::MAX;
        assert_eq!(
            normalize(DynSolValue::Uint(big, 256), &ParamKind::Uint(256)),
            Value::String(big.to_string())
        );
        let neg: I256 = "-42".parse().unwrap();
        assert_eq!(normalize(DynSolValue::Int(neg, 24), &ParamKind::Int(24)), json!("-42"));
        assert_eq!(normalize(DynSolValue::Uint(U256::from(7u8), 8), &ParamKind::Uint(8)), json!("7"));
    }

    #[test]
    fn addresses_are_checksummed() {
        let addr: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".parse().unwrap();
        assert_eq!(
            normalize(DynSolValue::Address(addr), &ParamKind::Address),
            json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
    }

    #[test]
    fn fixed_bytes_keep_declared_width() {
        let mut word = B256::ZERO;
        word[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            normalize(DynSolValue::FixedBytes(word, 4), &ParamKind::FixedBytes(4)),
            json!("0xdeadbeef")
        );
        let list = DynSolValue::Array(vec![DynSolValue::FixedBytes(word, 4)]);
        let kind = ParamKind::Array {
            elem: Box::new(ParamKind::FixedBytes(4)),
            len: None,
        };
        assert_eq!(normalize(list, &kind), json!(["0xdeadbeef"]));
    }

    #[test]
    fn tuple_array_maps_component_names() {
        let a = Address::repeat_byte(0x11);
        let b = Address::repeat_byte(0x22);
        let kind = ParamKind::Array {
            elem: Box::new(item_kind()),
            len: None,
        };
        let value = DynSolValue::Array(vec![item(1, a), item(2, b)]);
        assert_eq!(
            normalize(value, &kind),
            json!([
                {"id": "1", "owner": a.to_checksum(None)},
                {"id": "2", "owner": b.to_checksum(None)}
            ])
        );
    }

    #[test]
    fn single_tuple_array_collapses() {
        let a = Address::repeat_byte(0x33);
        let kind = ParamKind::Array {
            elem: Box::new(item_kind()),
            len: None,
        };
        let value = DynSolValue::Array(vec![item(9, a)]);
        assert_eq!(normalize(value, &kind), json!({"id": "9", "owner": a.to_checksum(None)}));

        let empty = DynSolValue::Array(vec![]);
        assert_eq!(normalize(empty, &kind), json!([]));
    }

    #[test]
    fn unnamed_components_use_position() {
        let kind = ParamKind::Tuple(vec![
            Component {
                name: String::new(),
                kind: ParamKind::Bool,
            },
            Component {
                name: "memo".into(),
                kind: ParamKind::String,
            },
        ]);
        let value = DynSolValue::Tuple(vec![
            DynSolValue::Bool(true),
            DynSolValue::String("hi".into()),
        ]);
        assert_eq!(normalize(value, &kind), json!({"0": true, "memo": "hi"}));
    }

    #[test]
    fn four_uint8_render_as_hex() {
        let kind = ParamKind::Array {
            elem: Box::new(ParamKind::Uint(8)),
            len: Some(4),
        };
        let bytes = |b: [u8; 4]| {
            DynSolValue::FixedArray(b.iter().map(|&x| DynSolValue::Uint(U256::from(x), 8)).collect())
        };
        assert_eq!(normalize(bytes([0x12, 0x34, 0x56, 0x78]), &kind), json!("0x12345678"));

        let list = ParamKind::Array {
            elem: Box::new(kind),
            len: None,
        };
        let value = DynSolValue::Array(vec![bytes([0xde, 0xad, 0xbe, 0xef]), bytes([0, 0, 0, 1])]);
        assert_eq!(normalize(value, &list), json!(["0xdeadbeef", "0x00000001"]));
    }

    #[test]
    fn other_small_uint_arrays_stay_lists() {
        let kind = ParamKind::Array {
            elem: Box::new(ParamKind::Uint(8)),
            len: Some(3),
        };
        let value = DynSolValue::FixedArray(vec![DynSolValue::Uint(U256::from(1), 8); 3]);
        assert_eq!(normalize(value, &kind), json!(["1", "1", "1"]));
    }
}
