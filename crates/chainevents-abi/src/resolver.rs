//! Signature Resolver: ABI JSON → canonical signatures → keccak hashes.
//!
//! The canonical signature of an event is `Name(type,type,...)` where tuple
//! inputs are expanded to `(component,component)` recursively and array
//! suffixes are kept. Its keccak-256 hash is what topic 0 of a matching log
//! carries:
//!
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use std::fs;
use std::path::{Path, PathBuf};

use chainevents_core::{AbiError, AbiEvent, AbiInput, DefinitionStore, EventDefinition, StorageError};
use serde_json::Value;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Failure of a whole `load_and_register` run.
///
/// Per-file problems never surface here; they are logged and skipped.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What a directory load did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// Event entries seen across all files (duplicates included).
    pub events_seen: usize,
    /// New definitions written to the store.
    pub registered: usize,
}

/// Canonical type token of one input.
///
/// Trailing `[]` / `[N]` markers are peeled off; a `tuple` base expands to
/// its components' canonical types in parentheses, then the markers are put
/// back. Any other base is returned as declared.
pub fn resolve_canonical_type(input: &AbiInput) -> String {
    let (base, suffixes) = split_array_suffixes(&input.ty);
    if base != "tuple" {
        return input.ty.clone();
    }
    let inner: Vec<String> = input.components.iter().map(resolve_canonical_type).collect();
    format!("({}){}", inner.join(","), suffixes)
}

/// `"tuple[2][]"` → `("tuple", "[2][]")`.
fn split_array_suffixes(ty: &str) -> (&str, &str) {
    let mut base = ty;
    while let Some(open) = base.strip_suffix(']').and_then(|s| s.rfind('[')) {
        base = &base[..open];
    }
    (base, &ty[base.len()..])
}

/// `Name(type,type,...)`.
pub fn build_signature(event: &AbiEvent) -> String {
    let types: Vec<String> = event.inputs.iter().map(resolve_canonical_type).collect();
    format!("{}({})", event.name, types.join(","))
}

/// `0x`-prefixed lowercase keccak-256 of the signature's UTF-8 bytes.
pub fn hash_signature(signature: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    format!("0x{}", hex::encode(output))
}

/// Event entries of one ABI document, each paired with its raw JSON text.
///
/// Accepts a bare ABI array or a compiler artifact object with an `abi` array.
/// Entries that are not events are ignored; event entries that do not fit the
/// ABI event shape are skipped with a warning.
pub fn parse_abi_events(text: &str, origin: &str) -> Result<Vec<(AbiEvent, String)>, AbiError> {
    let malformed = |reason: String| AbiError::Malformed {
        origin: origin.to_string(),
        reason,
    };

    let doc: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let entries = match doc {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match obj.remove("abi") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(malformed("expected a JSON array of ABI entries".into())),
        },
        _ => return Err(malformed("expected a JSON array of ABI entries".into())),
    };

    let mut events = Vec::new();
    for entry in entries {
        if entry.get("type").and_then(Value::as_str) != Some("event") {
            continue;
        }
        let raw = entry.to_string();
        match serde_json::from_value::<AbiEvent>(entry) {
            Ok(event) => events.push((event, raw)),
            Err(e) => tracing::warn!(origin, error = %e, "skipping malformed event entry"),
        }
    }
    Ok(events)
}

/// Walk `dir` (recursively), register every event found in `*.json` files.
///
/// Existing definitions are left untouched, so running this twice is a no-op
/// the second time. Unreadable or unparsable files are skipped with a
/// warning. A missing directory is returned as `AbiError::MissingDirectory`;
/// callers treat it as non-fatal and keep running with whatever is stored.
pub async fn load_and_register(
    dir: &Path,
    store: &dyn DefinitionStore,
) -> Result<LoadSummary, RegisterError> {
    if !dir.is_dir() {
        return Err(AbiError::MissingDirectory {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut files = Vec::new();
    collect_json_files(dir, &mut files)?;
    files.sort();

    let mut summary = LoadSummary::default();
    for path in files {
        summary.files_scanned += 1;
        let origin = path.display().to_string();

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %origin, error = %e, "skipping unreadable ABI file");
                summary.files_skipped += 1;
                continue;
            }
        };
        let events = match parse_abi_events(&text, &origin) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(file = %origin, error = %e, "skipping ABI file");
                summary.files_skipped += 1;
                continue;
            }
        };

        for (event, raw) in events {
            summary.events_seen += 1;
            let signature = build_signature(&event);
            let definition = EventDefinition {
                signature_hash: hash_signature(&signature),
                name: event.name.clone(),
                raw_definition_json: raw,
            };
            if store.insert_definition_if_absent(&definition).await? {
                summary.registered += 1;
                tracing::debug!(%signature, hash = %definition.signature_hash, "registered event");
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        files = summary.files_scanned,
        skipped = summary.files_skipped,
        events = summary.events_seen,
        registered = summary.registered,
        "ABI directory loaded"
    );
    Ok(summary)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), AbiError> {
    let io_err = |source| AbiError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            out.push(path);
        }
    }
    Ok(())
}
