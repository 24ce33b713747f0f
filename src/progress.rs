//! Progress reporting
//!
//! The engine emits lifecycle events through a stateless sink. Reporting is
//! infallible by construction so it can never block or abort a run; the
//! console implementation prints glyph-prefixed status lines and the null
//! implementation discards everything (embedding, tests).

use colored::Colorize;

/// A lifecycle event emitted by the migration engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The plan was computed from the source database list
    PlanReady {
        /// Databases selected for migration
        selected: usize,
        /// Databases reported by the source
        total: usize,
    },
    /// Processing of a database began
    DatabaseStarted { database: String },
    /// The database was created (or already existed) on the destination
    DatabaseCreated { database: String },
    /// All measurements of the database were processed
    DatabaseCompleted { database: String },
    /// The database was aborted by a database-level failure
    DatabaseFailed { database: String, message: String },
    /// A measurement transfer began
    MeasurementStarted {
        database: String,
        measurement: String,
    },
    /// The measurement was already `Done` in the checkpoint
    MeasurementSkipped {
        database: String,
        measurement: String,
    },
    /// The measurement transferred successfully
    MeasurementMigrated {
        database: String,
        measurement: String,
        points: u64,
        chunks: usize,
    },
    /// The measurement failed; recorded in the checkpoint and retried later
    MeasurementFailed {
        database: String,
        measurement: String,
        message: String,
    },
    /// Cancellation was requested; the run is winding down
    CancelRequested,
}

/// Stateless sink for lifecycle events.
///
/// Implementations must not panic; the engine treats delivery as
/// fire-and-forget.
pub trait ProgressReporter: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Reporter that prints human-readable progress lines
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for ConsoleReporter {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PlanReady { selected, total } => {
                println!(
                    "{} loaded [{}/{}] databases",
                    "✓".green(),
                    selected,
                    total
                );
            }
            ProgressEvent::DatabaseStarted { database } => {
                println!("{} Processing \"{}\"", "→".cyan().bold(), database.yellow());
            }
            ProgressEvent::DatabaseCreated { database } => {
                println!("  {} database \"{}\" ready on destination", "✓".green(), database);
            }
            ProgressEvent::DatabaseCompleted { database } => {
                println!(
                    "{} Migrating database \"{}\" completed",
                    "✓".green().bold(),
                    database.yellow()
                );
            }
            ProgressEvent::DatabaseFailed { database, message } => {
                println!(
                    "{} database \"{}\" aborted: {}",
                    "✗".red().bold(),
                    database.yellow(),
                    message
                );
            }
            ProgressEvent::MeasurementStarted {
                database,
                measurement,
            } => {
                println!(
                    "  {} migrating \"{}\".\"{}\"",
                    "→".cyan(),
                    database,
                    measurement
                );
            }
            ProgressEvent::MeasurementSkipped {
                database,
                measurement,
            } => {
                println!(
                    "  {} skip \"{}\".\"{}\"",
                    "ℹ".blue(),
                    database,
                    measurement
                );
            }
            ProgressEvent::MeasurementMigrated {
                database,
                measurement,
                points,
                chunks,
            } => {
                println!(
                    "  {} \"{}\".\"{}\" ({} points, {} chunks)",
                    "✓".green(),
                    database,
                    measurement,
                    points,
                    chunks
                );
            }
            ProgressEvent::MeasurementFailed {
                database,
                measurement,
                message,
            } => {
                println!(
                    "  {} error during migrating \"{}\".\"{}\": {}",
                    "⚠".yellow(),
                    database,
                    measurement,
                    message
                );
            }
            ProgressEvent::CancelRequested => {
                println!("{} cancel requested, finishing in-flight writes", "⚠".yellow().bold());
            }
        }
    }
}

/// Reporter that discards all events
#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn event(&self, _event: ProgressEvent) {}
}
