//! Error types shared across the ChainEvents pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. The process reports them and exits.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid RPC URL '{url}': scheme must be one of http://, https://, ws://, wss://")]
    UnsupportedScheme { url: String },

    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors raised while reading or interpreting ABI definitions.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("ABI directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ABI JSON in {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    #[error("unsupported ABI type '{ty}'")]
    UnsupportedType { ty: String },
}

/// Errors raised while decoding a single log against a known definition.
///
/// These never abort a range: the affected parameter is skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("type mismatch for '{param}': expected {expected}")]
    TypeMismatch { param: String, expected: String },
}

/// Persistence failures. A range whose commit fails is rolled back whole.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cursor cannot move backwards from {current} to {requested}")]
    CursorRegression { current: u64, requested: u64 },

    #[error("{0}")]
    Other(String),
}
