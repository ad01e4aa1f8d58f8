//! backup-rotator - Main entry point
//!
//! Archives the given source directories into the destination root and
//! rotates each source's archives down to the retention window.

use anyhow::Result;
use backup_rotator::{
    utils, BackupOrchestrator, BackupRequest, Config, RetentionPolicy, SystemClock, TarGzCreator,
    TarGzOptions,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source directories to back up
    #[arg(value_name = "SOURCE", required = true)]
    sources: Vec<PathBuf>,

    /// Destination root for archives (overrides config)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Newest archives to keep per source (overrides config)
    #[arg(short, long)]
    keep: Option<usize>,

    /// Simulate the run without touching the filesystem
    #[arg(long)]
    dry_run: bool,

    /// Abort archive creation after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // CLI flags override config file values
    if let Some(dest) = args.dest {
        config.storage.destination_root = dest;
    }
    if let Some(keep) = args.keep {
        config.storage.max_archives_per_source = keep;
    }
    if let Some(secs) = args.timeout_secs {
        config.run.creation_timeout_secs = secs;
    }
    if args.dry_run {
        config.run.dry_run = true;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting backup-rotator v{} (destination: {}, keep: {})",
        env!("CARGO_PKG_VERSION"),
        config.storage.destination_root.display(),
        config.storage.max_archives_per_source
    );

    let policy = RetentionPolicy::new(config.storage.max_archives_per_source)?;
    let creator = TarGzCreator::new(TarGzOptions {
        exclude_patterns: config.archive.exclude_patterns.clone(),
        compression_level: config.archive.compression_level,
    });

    // A signal finishes the current source, then stops the run.
    let cancel_token = CancellationToken::new();
    spawn_signal_listener(cancel_token.clone());

    let mut orchestrator = BackupOrchestrator::with_cancel(
        config.storage.destination_root.clone(),
        policy,
        Arc::new(creator),
        Arc::new(SystemClock),
        cancel_token,
    );
    if config.run.creation_timeout_secs > 0 {
        orchestrator = orchestrator
            .with_creation_timeout(Duration::from_secs(config.run.creation_timeout_secs));
    }

    let requests: Vec<BackupRequest> = args
        .sources
        .iter()
        .map(|dir| BackupRequest {
            source_dir: dir.clone(),
            dry_run: config.run.dry_run,
        })
        .collect();

    let summary = orchestrator.run(requests).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for outcome in &summary.outcomes {
            println!("{}", outcome.summary());
        }
    }

    if summary.has_failures() {
        tracing::error!(
            failed = summary.failed_count(),
            total = summary.outcomes.len(),
            "Run finished with failures"
        );
        std::process::exit(1);
    }

    tracing::info!(
        created = summary.created_count(),
        dry_run = summary.dry_run_count(),
        "Run finished"
    );
    Ok(())
}

/// Cancel the run on SIGINT or SIGTERM.
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.ok();
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received SIGINT, finishing current source then stopping");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, finishing current source then stopping");
            }
        }

        token.cancel();
    });
}
