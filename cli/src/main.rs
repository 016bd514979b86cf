//! chaintally daemon — keep a running PulseChain transaction total.
//!
//! Usage:
//! ```bash
//! # Run the poll loop (one cycle immediately, then every 5 minutes)
//! chaintally run
//!
//! # Run a single reconcile-and-publish cycle, then exit
//! chaintally once
//!
//! # Print the persisted checkpoint
//! chaintally status
//! ```
//!
//! All tunables are fixed constants (see `TallyConfig::default`); the
//! daemon takes no flags and reads no configuration from the environment.

use std::env;
use std::process;

use chaintally_core::checkpoint::{CheckpointStore, JsonFileStore};
use chaintally_core::publish::{render, SnapshotWriter};
use chaintally_core::reconcile::Reconciler;
use chaintally_core::TallyConfig;
use chaintally_http::HttpChainSource;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("run");

    let result = match command {
        "run" => cmd_run().await,
        "once" => cmd_once().await,
        "status" => cmd_status().await,
        "version" | "--version" | "-V" => {
            println!("chaintally {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chaintally {}", env!("CARGO_PKG_VERSION"));
    println!("Tally PulseChain transactions and publish a JSON snapshot\n");
    println!("USAGE:");
    println!("    chaintally [COMMAND]\n");
    println!("COMMANDS:");
    println!("    run      Poll loop: reconcile and publish every 5 minutes [default]");
    println!("    once     Run a single reconcile-and-publish cycle, then exit");
    println!("    status   Print the persisted checkpoint");
    println!("    version  Print version");
    println!("    help     Print this help");
}

async fn cmd_run() -> anyhow::Result<()> {
    let config = TallyConfig::default();
    tracing::info!(
        output = %config.output_path.display(),
        state = %config.state_path.display(),
        seed_block = config.seed_block,
        seed_transactions = config.seed_transactions,
        "starting chaintally"
    );

    let reconciler = Reconciler::new(
        JsonFileStore::new(&config.state_path),
        HttpChainSource::new(&config),
        config.clone(),
    );
    let writer = SnapshotWriter::new(&config.output_path, config.fork_block);

    loop {
        cycle(&reconciler, &writer, &config).await;
        tokio::time::sleep(config.poll_interval).await;
    }
}

async fn cmd_once() -> anyhow::Result<()> {
    let config = TallyConfig::default();
    let reconciler = Reconciler::new(
        JsonFileStore::new(&config.state_path),
        HttpChainSource::new(&config),
        config.clone(),
    );
    let writer = SnapshotWriter::new(&config.output_path, config.fork_block);

    cycle(&reconciler, &writer, &config).await;
    Ok(())
}

/// One reconcile-and-publish cycle. Never fails: the reconciler degrades
/// internally and the writer swallows its own errors, so a bad cycle
/// leaves the previous snapshot standing and the loop running.
async fn cycle(
    reconciler: &Reconciler<JsonFileStore, HttpChainSource>,
    writer: &SnapshotWriter,
    config: &TallyConfig,
) {
    let report = reconciler.run_cycle().await;
    let snapshot = render(&report.checkpoint, config.fork_block, report.warning.clone());
    writer.publish(&snapshot, &report.checkpoint);
}

async fn cmd_status() -> anyhow::Result<()> {
    let config = TallyConfig::default();
    let store = JsonFileStore::new(&config.state_path);

    match store.load().await? {
        Some(checkpoint) => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
        None => println!(
            "no checkpoint at {} (next run seeds block {}, {} transactions)",
            config.state_path.display(),
            config.seed_block,
            config.seed_transactions
        ),
    }
    Ok(())
}
