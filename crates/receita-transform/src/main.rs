//! Receita Transform - joins registry exports into JSON documents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use receita_common::logging::{init_logging, LogConfig, LogLevel};
use receita_transform::sink::JsonLinesSink;
use receita_transform::{cleanup_stale_stores, Orchestrator, TransformConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "receita-transform")]
#[command(author, version, about = "Join registry export files into one JSON document per establishment")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both phases and write JSON Lines output
    Run {
        /// Directory with the downloaded export files
        #[arg(short = 'd', long, env = "RECEITA_SOURCE_DIR", default_value = "data")]
        source_dir: PathBuf,

        /// Output file (one JSON document per line)
        #[arg(short, long, default_value = "companies.jsonl")]
        output: PathBuf,

        /// Include email addresses, CPFs and other personal data
        #[arg(short = 'p', long)]
        no_privacy: bool,

        /// Records per output batch
        #[arg(short, long, env = "RECEITA_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Concurrent enrichment workers
        #[arg(short, long, env = "RECEITA_WORKERS")]
        workers: Option<usize>,

        /// Keep the key-value store directory after the run
        #[arg(long)]
        keep_store: bool,

        /// Hide progress bars
        #[arg(long)]
        quiet: bool,
    },

    /// Remove key-value store directories left by interrupted runs
    Cleanup {
        /// Directory the stores were created in (defaults to the system temp dir)
        #[arg(long, env = "RECEITA_STORE_ROOT")]
        store_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().context("Invalid logging configuration")?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            source_dir,
            output,
            no_privacy,
            batch_size,
            workers,
            keep_store,
            quiet,
        } => {
            let defaults = TransformConfig::from_env();
            let defaults_privacy = defaults.privacy;
            let config = TransformConfig {
                batch_size: batch_size.unwrap_or(defaults.batch_size),
                workers: workers.unwrap_or(defaults.workers),
                keep_store: keep_store || defaults.keep_store,
                ..defaults
            }
            .with_source_dir(source_dir)
            .with_privacy(defaults_privacy && !no_privacy)
            .with_show_progress(!quiet);

            let sink = Arc::new(JsonLinesSink::new(output));
            let summary = Orchestrator::new(config)
                .run(sink)
                .await
                .context("Transform failed")?;
            info!("{}", summary.summary());
        },
        Command::Cleanup { store_root } => {
            let root = store_root.unwrap_or_else(std::env::temp_dir);
            let removed = cleanup_stale_stores(&root)?;
            info!(removed, root = %root.display(), "Cleanup complete");
        },
    }

    Ok(())
}
