//! Indexer configuration.
//!
//! The binary fills these records from flags and environment variables; the
//! library crates only ever see the typed form.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;

use crate::error::ConfigError;

pub const DEFAULT_RPC_URL: &str = "https://0xrpc.io/base";
pub const DEFAULT_CONTRACT: &str = "0x91Cf2D8Ed503EC52768999aA6D8DBeA6e52dbe43";
pub const DEFAULT_START_BLOCK: u64 = 8_443_806;
pub const DEFAULT_FINALITY_LAG: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 100;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 10_000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where indexing starts when no cursor has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlock {
    /// An absolute block number (never below 1).
    Number(u64),
    /// Start at the confirmed chain head; history is skipped.
    Head,
}

impl FromStr for StartBlock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("head") || s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Head);
        }
        let n: i128 = s.parse().map_err(|e| ConfigError::InvalidValue {
            field: "START_BLOCK",
            reason: format!("'{s}': {e}"),
        })?;
        let n = u64::try_from(n.max(1)).map_err(|_| ConfigError::InvalidValue {
            field: "START_BLOCK",
            reason: format!("'{s}' is out of range"),
        })?;
        Ok(Self::Number(n))
    }
}

/// Bounded fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// Configuration for an indexer instance.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// JSON-RPC endpoint (`http`, `https`, `ws` or `wss`).
    pub rpc_url: String,
    /// Contract whose logs are indexed.
    pub contract_address: String,
    /// Directory scanned for ABI JSON files.
    pub abi_dir: PathBuf,
    pub start_block: StartBlock,
    /// Blocks held back from the head before scanning.
    pub finality_lag: u64,
    /// Widest range requested in a single `eth_getLogs` call.
    pub max_block_range: u64,
    /// Sleep between head polls in live mode.
    pub poll_interval: Duration,
    /// Upper bound for any single RPC call.
    pub call_timeout: Duration,
    /// Upper bound for the liveness probe after dialing.
    pub probe_timeout: Duration,
    /// Dial + probe attempts, also used by reconnect.
    pub connect_retry: RetryBudget,
    /// Attempts for one log fetch.
    pub fetch_retry: RetryBudget,
    pub verbose: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            contract_address: DEFAULT_CONTRACT.into(),
            abi_dir: PathBuf::from("./abi"),
            start_block: StartBlock::Number(DEFAULT_START_BLOCK),
            finality_lag: DEFAULT_FINALITY_LAG,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            connect_retry: RetryBudget::default(),
            fetch_retry: RetryBudget::default(),
            verbose: false,
        }
    }
}

impl IndexerConfig {
    /// Parsed target contract.
    pub fn contract(&self) -> Result<Address, ConfigError> {
        self.contract_address
            .parse::<Address>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "CONTRACT_ADDRESS",
                reason: format!("'{}': {e}", self.contract_address),
            })
    }

    /// Check the values that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contract()?;
        if self.max_block_range == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_BLOCK_RANGE",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// PostgreSQL connection parameters.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Full URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 15432,
            user: "postgres".into(),
            password: "postgres".into(),
            dbname: "postgres".into(),
            url: None,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode=disable",
                self.user, self.password, self.host, self.port, self.dbname
            ),
        }
    }

    /// Same as `connection_url` with the password masked, for logs.
    pub fn redacted(&self) -> String {
        match &self.url {
            Some(_) => "<DATABASE_URL>".into(),
            None => format!(
                "postgres://{}:******@{}:{}/{}",
                self.user, self.host, self.port, self.dbname
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = IndexerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.finality_lag, 10);
        assert_eq!(cfg.max_block_range, 10_000);
    }

    #[test]
    fn start_block_parsing() {
        assert_eq!("head".parse::<StartBlock>().unwrap(), StartBlock::Head);
        assert_eq!("LATEST".parse::<StartBlock>().unwrap(), StartBlock::Head);
        assert_eq!("1200".parse::<StartBlock>().unwrap(), StartBlock::Number(1200));
        assert_eq!("0".parse::<StartBlock>().unwrap(), StartBlock::Number(1));
        assert_eq!("-5".parse::<StartBlock>().unwrap(), StartBlock::Number(1));
        assert!("abc".parse::<StartBlock>().is_err());
    }

    #[test]
    fn zero_block_range_is_rejected() {
        let cfg = IndexerConfig {
            max_block_range: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_contract_is_rejected() {
        let cfg = IndexerConfig {
            contract_address: "0x1234".into(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "CONTRACT_ADDRESS", .. })
        ));
    }

    #[test]
    fn database_url_masks_password() {
        let db = DatabaseConfig::default();
        assert!(db.connection_url().contains(":postgres@127.0.0.1:15432/postgres"));
        assert!(!db.redacted().contains(":postgres@"));
    }

    #[test]
    fn retry_budget_has_at_least_one_attempt() {
        assert_eq!(RetryBudget::new(0, Duration::ZERO).attempts(), 1);
    }
}
