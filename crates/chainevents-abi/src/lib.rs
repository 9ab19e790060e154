//! chainevents-abi: turns ABI JSON into hash-addressed event signatures and
//! decodes raw contract logs against them.
//!
//! - [`resolver`]: canonical signatures, keccak hashing, ABI directory loading.
//! - [`table`]: the in-memory signature table the decoder consults.
//! - [`decoder`]: topic + data decoding into a [`DecodedEvent`](chainevents_core::DecodedEvent).
//! - [`normalizer`]: component-aware conversion of decoded values to JSON.

pub mod decoder;
pub mod normalizer;
pub mod resolver;
pub mod table;

pub use decoder::LogDecoder;
pub use resolver::{
    build_signature, hash_signature, load_and_register, resolve_canonical_type, LoadSummary,
    RegisterError,
};
pub use table::{build_active_signature_table, EventSignatureInfo, InputInfo, SignatureTable};
