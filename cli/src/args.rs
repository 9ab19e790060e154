//! Command-line flags. Every flag falls back to an environment variable.

use std::path::PathBuf;
use std::time::Duration;

use chainevents_core::config::{
    DEFAULT_CONTRACT, DEFAULT_FINALITY_LAG, DEFAULT_MAX_BLOCK_RANGE, DEFAULT_MAX_RETRIES,
    DEFAULT_RPC_URL, DEFAULT_START_BLOCK,
};
use chainevents_core::{DatabaseConfig, IndexerConfig, RetryBudget, StartBlock};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "chainevents",
    about = "Index and decode a contract's event logs into PostgreSQL",
    long_about = "
ChainEvents: follows an EVM chain, decodes every log emitted by one contract
against the ABIs in ABI_DIR and stores them in PostgreSQL.

Every flag can also be set through the environment variable shown in --help.
RUST_LOG overrides the log filter.
",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub indexer: IndexerArgs,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load ABIs, catch up and follow the chain head (default)
    Run,

    /// Register the events found under the ABI directory and exit
    #[command(name = "load-abi")]
    LoadAbi,

    /// Print the persisted cursor and stored counts
    Status,

    /// Move the cursor to an explicit block; the next run resumes after it
    #[command(name = "reset-cursor")]
    ResetCursor {
        /// Last block to treat as processed
        #[arg(long)]
        block: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct IndexerArgs {
    /// JSON-RPC endpoint (http, https, ws or wss)
    #[arg(long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Contract whose logs are indexed
    #[arg(long, env = "CONTRACT_ADDRESS", default_value = DEFAULT_CONTRACT)]
    pub contract_address: String,

    /// Directory scanned recursively for ABI JSON files
    #[arg(long, env = "ABI_DIR", default_value = "./abi")]
    pub abi_dir: PathBuf,

    /// First block on a fresh database, or `head`
    #[arg(long, env = "START_BLOCK", default_value_t = DEFAULT_START_BLOCK.to_string())]
    pub start_block: String,

    /// Blocks held back from the chain head
    #[arg(long, env = "FINALITY_BLOCK", default_value_t = DEFAULT_FINALITY_LAG)]
    pub finality_lag: u64,

    /// Connect attempts (dial and probe)
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Pause between connect attempts, in seconds
    #[arg(long, env = "RETRY_DELAY_SECONDS", default_value_t = 5)]
    pub retry_delay_seconds: u64,

    /// Attempts per log fetch [default: MAX_RETRIES]
    #[arg(long, env = "FETCH_MAX_RETRIES")]
    pub fetch_max_retries: Option<u32>,

    /// Pause between log fetch attempts, in milliseconds [default: RETRY_DELAY_SECONDS]
    #[arg(long, env = "FETCH_RETRY_DELAY_MS")]
    pub fetch_retry_delay_ms: Option<u64>,

    /// Widest block range per eth_getLogs call
    #[arg(long, env = "MAX_BLOCK_RANGE", default_value_t = DEFAULT_MAX_BLOCK_RANGE)]
    pub max_block_range: u64,

    /// Head poll interval in live mode, in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 2_000)]
    pub poll_interval_ms: u64,

    /// Timeout for a single RPC call, in seconds
    #[arg(long, env = "CALL_TIMEOUT_SECONDS", default_value_t = 30)]
    pub call_timeout_seconds: u64,

    /// Debug-level logs for the indexer crates
    #[arg(short, long, env = "VERBOSE_LOGS")]
    pub verbose: bool,
}

impl IndexerArgs {
    pub fn to_config(&self) -> Result<IndexerConfig, chainevents_core::ConfigError> {
        let connect_retry =
            RetryBudget::new(self.max_retries, Duration::from_secs(self.retry_delay_seconds));
        let fetch_retry = RetryBudget::new(
            self.fetch_max_retries.unwrap_or(connect_retry.max_attempts),
            self.fetch_retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(connect_retry.delay),
        );
        let config = IndexerConfig {
            rpc_url: self.rpc_url.clone(),
            contract_address: self.contract_address.clone(),
            abi_dir: self.abi_dir.clone(),
            start_block: self.start_block.parse()?,
            finality_lag: self.finality_lag,
            max_block_range: self.max_block_range,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            call_timeout: Duration::from_secs(self.call_timeout_seconds),
            connect_retry,
            fetch_retry,
            verbose: self.verbose,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    #[arg(long, env = "PG_HOST", default_value = "127.0.0.1")]
    pub pg_host: String,

    #[arg(long, env = "PG_PORT", default_value_t = 15432)]
    pub pg_port: u16,

    #[arg(long, env = "PG_USER", default_value = "postgres")]
    pub pg_user: String,

    #[arg(long, env = "PG_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub pg_password: String,

    #[arg(long, env = "PG_DBNAME", default_value = "postgres")]
    pub pg_dbname: String,

    /// Full connection URL; overrides the PG_* values
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "PG_MAX_CONNECTIONS", default_value_t = 5)]
    pub pg_max_connections: u32,
}

impl DatabaseArgs {
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.pg_host.clone(),
            port: self.pg_port,
            user: self.pg_user.clone(),
            password: self.pg_password.clone(),
            dbname: self.pg_dbname.clone(),
            url: self.database_url.clone(),
            max_connections: self.pg_max_connections,
        }
    }
}
