//! chainevents: contract event-log indexer.
//!
//! # Commands
//! ```text
//! chainevents [run]                    index forever (default)
//! chainevents load-abi                 register ABI events and exit
//! chainevents status                   print cursor and stored counts
//! chainevents reset-cursor --block N   rewind or skip ahead
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chainevents_core::{DatabaseConfig, DefinitionStore, EventStore};
use chainevents_indexer::IndexerService;
use chainevents_storage::PostgresStorage;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod args;

use args::{Cli, Command, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.indexer.verbose, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, with the chainevents crates at `debug` when verbose.
fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose { "info,chainevents=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db = cli.database.to_config();
    let command = cli.command.clone().unwrap_or(Command::Run);

    match command {
        Command::Run | Command::LoadAbi => {
            let config = cli.indexer.to_config().context("invalid configuration")?;
            tracing::info!(
                contract = %config.contract_address,
                abi_dir = %config.abi_dir.display(),
                start_block = ?config.start_block,
                finality_lag = config.finality_lag,
                max_block_range = config.max_block_range,
                connect_attempts = config.connect_retry.attempts(),
                fetch_attempts = config.fetch_retry.attempts(),
                database = %db.redacted(),
                "configuration loaded"
            );
            let store = open_store(&db).await?;
            let service = IndexerService::new(config, store.clone(), store)?;

            if command == Command::LoadAbi {
                match service.load_abis().await? {
                    Some(summary) => println!(
                        "scanned {} file(s), skipped {}, saw {} event(s), registered {} new definition(s)",
                        summary.files_scanned,
                        summary.files_skipped,
                        summary.events_seen,
                        summary.registered
                    ),
                    None => println!("ABI directory {} not found", service.config().abi_dir.display()),
                }
                return Ok(());
            }

            if let Err(e) = service.run_until(shutdown_signal()).await {
                let what = if e.is_fatal() { "indexer cannot continue" } else { "indexer stopped" };
                return Err(anyhow::Error::new(e).context(what));
            }
        }

        Command::Status => {
            let store = open_store(&db).await?;
            let cursor = store.load_cursor().await.context("reading cursor")?;
            let definitions = store.load_definitions().await.context("reading definitions")?;
            let events = store.event_count().await.context("counting events")?;
            match cursor {
                Some(c) => println!("cursor:      {}", c.count),
                None => println!("cursor:      (none, next run starts at {})", cli.indexer.start_block),
            }
            println!("definitions: {}", definitions.len());
            println!("events:      {events}");
        }

        Command::ResetCursor { block } => {
            let store = open_store(&db).await?;
            store.reset_cursor(block).await.context("resetting cursor")?;
            tracing::warn!(block, "cursor reset");
            println!("cursor set to {block}; the next run resumes at {}", block.saturating_add(1));
        }
    }
    Ok(())
}

async fn open_store(db: &DatabaseConfig) -> Result<Arc<PostgresStorage>> {
    let store = PostgresStorage::from_config(db)
        .await
        .with_context(|| format!("connecting to {}", db.redacted()))?;
    store.init_schema().await.context("creating tables")?;
    Ok(Arc::new(store))
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
