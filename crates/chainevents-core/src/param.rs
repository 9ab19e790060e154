//! The closed set of ABI parameter kinds the decoder understands.
//!
//! Every declared input is parsed once into a `ParamKind` when the signature
//! table is built; the decoder then dispatches on the tag instead of
//! inspecting runtime values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::abi::AbiInput;
use crate::error::AbiError;

/// A named member of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Component name from the ABI (may be empty).
    pub name: String,
    pub kind: ParamKind,
}

/// ABI parameter kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// 20-byte account address.
    Address,
    /// Signed integer, width in bits.
    Int(u16),
    /// Unsigned integer, width in bits.
    Uint(u16),
    Bool,
    String,
    /// Dynamic byte sequence.
    Bytes,
    /// `bytes1` .. `bytes32`, length in bytes.
    FixedBytes(u8),
    /// Struct with ordered, named members.
    Tuple(Vec<Component>),
    /// `T[]` when `len` is `None`, `T[N]` otherwise.
    Array {
        elem: Box<ParamKind>,
        len: Option<usize>,
    },
}

impl ParamKind {
    /// Parse a declared input (type string plus tuple components).
    pub fn from_input(input: &AbiInput) -> Result<Self, AbiError> {
        Self::parse(&input.ty, &input.components)
    }

    /// Parse a type string; `components` are consulted only for `tuple` bases.
    pub fn parse(ty: &str, components: &[AbiInput]) -> Result<Self, AbiError> {
        let unsupported = || AbiError::UnsupportedType { ty: ty.to_string() };

        if let Some(open) = ty.strip_suffix(']').and_then(|s| s.rfind('[')) {
            let len_str = &ty[open + 1..ty.len() - 1];
            let len = if len_str.is_empty() {
                None
            } else {
                Some(len_str.parse::<usize>().map_err(|_| unsupported())?)
            };
            let elem = Self::parse(&ty[..open], components)?;
            return Ok(Self::Array {
                elem: Box::new(elem),
                len,
            });
        }

        match ty {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "function" => Ok(Self::FixedBytes(24)),
            "tuple" => {
                let members = components
                    .iter()
                    .map(|c| {
                        Ok(Component {
                            name: c.name.clone(),
                            kind: Self::from_input(c)?,
                        })
                    })
                    .collect::<Result<Vec<_>, AbiError>>()?;
                Ok(Self::Tuple(members))
            }
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    parse_int_width(bits).map(Self::Uint).ok_or_else(unsupported)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    parse_int_width(bits).map(Self::Int).ok_or_else(unsupported)
                } else if let Some(size) = ty.strip_prefix("bytes") {
                    match size.parse::<u8>() {
                        Ok(n @ 1..=32) => Ok(Self::FixedBytes(n)),
                        _ => Err(unsupported()),
                    }
                } else {
                    Err(unsupported())
                }
            }
        }
    }

    /// Indexed values of these kinds are stored in topics as a keccak hash,
    /// so the original value cannot be recovered from the log.
    pub fn is_hashed_in_topic(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Bytes | Self::Tuple(_) | Self::Array { .. }
        )
    }
}

/// `""` means the default 256-bit width.
fn parse_int_width(bits: &str) -> Option<u16> {
    if bits.is_empty() {
        return Some(256);
    }
    match bits.parse::<u16>() {
        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Some(n),
        _ => None,
    }
}

/// Canonical ABI type token, e.g. `(uint256,address)[]`.
impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Tuple(members) => {
                let parts: Vec<_> = members.iter().map(|m| m.kind.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
            Self::Array { elem, len: None } => write!(f, "{elem}[]"),
            Self::Array {
                elem,
                len: Some(n),
            } => write!(f, "{elem}[{n}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> AbiInput {
        AbiInput::new("point", "tuple", false).with_components(vec![
            AbiInput::new("a", "uint256", false),
            AbiInput::new("b", "address", false),
        ])
    }

    #[test]
    fn parses_primitives() {
        assert_eq!(ParamKind::parse("address", &[]).unwrap(), ParamKind::Address);
        assert_eq!(ParamKind::parse("uint", &[]).unwrap(), ParamKind::Uint(256));
        assert_eq!(ParamKind::parse("int24", &[]).unwrap(), ParamKind::Int(24));
        assert_eq!(ParamKind::parse("bytes4", &[]).unwrap(), ParamKind::FixedBytes(4));
        assert_eq!(ParamKind::parse("bytes", &[]).unwrap(), ParamKind::Bytes);
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(ParamKind::parse("uint7", &[]).is_err());
        assert!(ParamKind::parse("bytes33", &[]).is_err());
        assert!(ParamKind::parse("fixed128x18", &[]).is_err());
        assert!(ParamKind::parse("uint256[x]", &[]).is_err());
    }

    #[test]
    fn nested_arrays_are_outermost_last() {
        let kind = ParamKind::parse("uint8[2][]", &[]).unwrap();
        match kind {
            ParamKind::Array { elem, len: None } => {
                assert_eq!(
                    *elem,
                    ParamKind::Array {
                        elem: Box::new(ParamKind::Uint(8)),
                        len: Some(2)
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tuple_array_display_and_hashing() {
        let mut input = point();
        input.ty = "tuple[]".into();
        let kind = ParamKind::from_input(&input).unwrap();
        assert_eq!(kind.to_string(), "(uint256,address)[]");
        match &kind {
            ParamKind::Array { elem, len: None } => match elem.as_ref() {
                ParamKind::Tuple(members) => {
                    let names: Vec<_> = members.iter().map(|c| c.name.as_str()).collect();
                    assert_eq!(names, ["a", "b"]);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
        assert!(kind.is_hashed_in_topic());
        assert!(!ParamKind::Uint(256).is_hashed_in_topic());
    }
}
