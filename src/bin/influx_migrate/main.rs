//! influx-migrate - resumable InfluxDB-to-InfluxDB migration CLI
//!
//! Copies every database and measurement from a source cluster to a
//! destination cluster, checkpointing progress after each measurement so an
//! interrupted run resumes where it left off.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use regex::Regex;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use influx_migrate::{
    checkpoint::{CheckpointStore, JsonFileCheckpoint},
    config::{HostPort, MigrateConfig, DEFAULT_CHECKPOINT_PATH},
    engine::{DatabaseOutcome, EngineOptions, MeasurementOutcome, MigrationEngine, RunSummary},
    progress::ConsoleReporter,
    store::InfluxStore,
    MigrateError,
};

/// influx-migrate - migrate time-series data between InfluxDB clusters
#[derive(Parser, Debug)]
#[command(name = "influx-migrate")]
#[command(author, version, about = "Migrate data between InfluxDB clusters, resumably")]
struct MigrateArgs {
    /// Source cluster address (host:port)
    #[arg(short, long)]
    source: String,

    /// Destination cluster address (host:port)
    #[arg(short, long)]
    destination: String,

    /// Regex pattern to filter databases
    #[arg(short, long)]
    pattern: Option<String>,

    /// Start from a clean state (clears the checkpoint first)
    #[arg(short, long)]
    clean: bool,

    /// Checkpoint file path
    #[arg(long, default_value = DEFAULT_CHECKPOINT_PATH)]
    checkpoint: String,

    /// Maximum points per write chunk
    #[arg(long, default_value_t = influx_migrate::config::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Concurrent chunk writes per measurement
    #[arg(long, default_value_t = influx_migrate::config::DEFAULT_WRITE_FANOUT)]
    write_fanout: usize,
}

impl MigrateArgs {
    fn into_config(self) -> Result<(MigrateConfig, Option<Regex>), MigrateError> {
        let source = HostPort::parse(&self.source, "source")?;
        let destination = HostPort::parse(&self.destination, "destination")?;

        let pattern = self
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| MigrateError::Config(format!("invalid pattern: {e}")))?;

        let config = MigrateConfig {
            source,
            destination,
            pattern: self.pattern,
            chunk_size: self.chunk_size,
            write_fanout: self.write_fanout,
            checkpoint_path: self.checkpoint.into(),
            clean: self.clean,
        };
        config.validate()?;
        Ok((config, pattern))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = MigrateArgs::parse();
    let (config, pattern) = match args.into_config() {
        Ok(parsed) => parsed,
        Err(e) => {
            // Configuration problems are usage errors: show the message and
            // point at --help, before any network call.
            eprintln!("{} {e}", "✗".red().bold());
            eprintln!("Usage: influx-migrate --source 127.0.0.1:8086 --destination 127.0.0.1:9086");
            eprintln!("Run with --help for all options.");
            return ExitCode::from(2);
        }
    };

    match run(config, pattern).await {
        Ok(summary) => {
            print_summary(&summary);
            // Per-measurement failures are warnings, not process failures.
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e}", "✗".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: MigrateConfig, pattern: Option<Regex>) -> anyhow::Result<RunSummary> {
    let checkpoint = Arc::new(JsonFileCheckpoint::new(config.checkpoint_path.clone()));
    if config.clean {
        checkpoint.clear()?;
        println!("{} checkpoint cleared", "✓".green());
    }

    let source = Arc::new(InfluxStore::new(&config.source));
    let destination = Arc::new(InfluxStore::new(&config.destination));

    let engine = MigrationEngine::new(
        source,
        destination,
        checkpoint,
        Arc::new(ConsoleReporter::new()),
        EngineOptions {
            chunk_size: config.chunk_size,
            write_fanout: config.write_fanout,
        },
    );

    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling after in-flight writes");
            cancel.cancel();
        }
    });

    println!(
        "{} Migrating {} {} {}",
        "→".cyan().bold(),
        config.source.to_string().yellow(),
        "→".dimmed(),
        config.destination.to_string().yellow()
    );
    Ok(engine.run(pattern.as_ref()).await?)
}

fn print_summary(summary: &RunSummary) {
    let (skipped, succeeded, failed) = summary.measurement_totals();

    println!();
    if summary.cancelled {
        println!("{}", "⚠ Migration cancelled; progress was checkpointed.".yellow().bold());
    } else if summary.has_failures() {
        println!("{}", "⚠ Migration completed with failures.".yellow().bold());
    } else {
        println!("{}", "✓ Migration completed successfully!".green().bold());
    }
    println!();

    println!("{}", "Summary".bold().underline());
    println!("  Databases:    {}", summary.databases.len());
    println!("  Migrated:     {succeeded}");
    println!("  Skipped:      {skipped}");
    println!("  Failed:       {failed}");
    println!();

    for db in &summary.databases {
        if let DatabaseOutcome::Failed(message) = &db.outcome {
            println!("  {} \"{}\": {}", "✗".red(), db.database, message);
        }
        for m in &db.measurements {
            if let MeasurementOutcome::Failed(message) = &m.outcome {
                println!(
                    "  {} \"{}\".\"{}\": {}",
                    "⚠".yellow(),
                    db.database,
                    m.measurement,
                    message
                );
            }
        }
    }
    if failed > 0 {
        println!("\n  Failed measurements will be retried on the next run.");
    }
}
