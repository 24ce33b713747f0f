//! Migration engine
//!
//! Drives the checkpointed transfer state machine: databases strictly in
//! planner order, measurements strictly in source order, chunk writes with
//! bounded concurrent fan-out. Every state transition is persisted before
//! the engine moves on, so a restart resumes exactly where the last run
//! stopped and never repeats completed work.
//!
//! Failure containment:
//! - a failed measurement is recorded as `Failed(message)` and never aborts
//!   its siblings or its database;
//! - a failed measurement listing (or destination creation) aborts only
//!   that database;
//! - only the initial database listing aborts the whole run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointStore, MigrationState};
use crate::error::{MigrateError, Result};
use crate::planner::plan;
use crate::point::Point;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::TimeSeriesStore;

/// Engine tuning knobs
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Maximum points per write chunk
    pub chunk_size: usize,
    /// Chunk writes in flight per measurement
    pub write_fanout: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            write_fanout: crate::config::DEFAULT_WRITE_FANOUT,
        }
    }
}

/// Outcome of one measurement transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeasurementOutcome {
    /// Already `Done` in the checkpoint; nothing was queried or written
    Skipped,
    /// Transferred and recorded `Done`
    Succeeded,
    /// Attempt failed; recorded `Failed(message)` and retried next run
    Failed(String),
}

/// Outcome of one database
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseOutcome {
    /// All measurements were processed (some may still have failed)
    Completed,
    /// A database-level failure aborted this database
    Failed(String),
}

/// Per-measurement report within a run summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeasurementReport {
    pub measurement: String,
    pub outcome: MeasurementOutcome,
}

/// Per-database report within a run summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseReport {
    pub database: String,
    pub outcome: DatabaseOutcome,
    pub measurements: Vec<MeasurementReport>,
}

/// Summary of one engine run
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub databases: Vec<DatabaseReport>,
    /// True when the run stopped early on a cancellation request
    pub cancelled: bool,
}

impl RunSummary {
    /// Count of measurements by outcome: (skipped, succeeded, failed).
    pub fn measurement_totals(&self) -> (usize, usize, usize) {
        let mut totals = (0, 0, 0);
        for db in &self.databases {
            for m in &db.measurements {
                match m.outcome {
                    MeasurementOutcome::Skipped => totals.0 += 1,
                    MeasurementOutcome::Succeeded => totals.1 += 1,
                    MeasurementOutcome::Failed(_) => totals.2 += 1,
                }
            }
        }
        totals
    }

    /// Whether any database or measurement failed.
    pub fn has_failures(&self) -> bool {
        self.databases.iter().any(|db| {
            matches!(db.outcome, DatabaseOutcome::Failed(_))
                || db
                    .measurements
                    .iter()
                    .any(|m| matches!(m.outcome, MeasurementOutcome::Failed(_)))
        })
    }
}

/// The migration engine
pub struct MigrationEngine {
    source: Arc<dyn TimeSeriesStore>,
    destination: Arc<dyn TimeSeriesStore>,
    checkpoint: Arc<dyn CheckpointStore>,
    reporter: Arc<dyn ProgressReporter>,
    options: EngineOptions,
    cancelled: Arc<AtomicBool>,
}

impl MigrationEngine {
    pub fn new(
        source: Arc<dyn TimeSeriesStore>,
        destination: Arc<dyn TimeSeriesStore>,
        checkpoint: Arc<dyn CheckpointStore>,
        reporter: Arc<dyn ProgressReporter>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            destination,
            checkpoint,
            reporter,
            options,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting cooperative cancellation from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run a full migration pass.
    ///
    /// Fails only on checkpoint errors or a source database-list failure;
    /// everything below that is contained and reported in the summary.
    pub async fn run(&self, pattern: Option<&Regex>) -> Result<RunSummary> {
        let mut state = self.checkpoint.load()?;

        let all_databases = self.source.list_databases().await?;
        let selected = plan(&all_databases, pattern);
        self.reporter.event(ProgressEvent::PlanReady {
            selected: selected.len(),
            total: all_databases.len(),
        });

        if selected.is_empty() {
            info!("nothing to do: no databases selected");
            return Ok(RunSummary::default());
        }

        let mut summary = RunSummary::default();
        for database in &selected {
            if self.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let report = self.migrate_database(database, &mut state).await?;
            summary.databases.push(report);
        }

        if self.is_cancelled() {
            summary.cancelled = true;
            self.reporter.event(ProgressEvent::CancelRequested);
            // Final flush; individual transitions were already persisted.
            self.checkpoint.save(&state)?;
        }

        Ok(summary)
    }

    /// Process one database: ensure its state entry, discover measurements,
    /// create it on the destination, then transfer measurements one by one.
    async fn migrate_database(
        &self,
        database: &str,
        state: &mut MigrationState,
    ) -> Result<DatabaseReport> {
        self.reporter.event(ProgressEvent::DatabaseStarted {
            database: database.to_string(),
        });

        // The database is observed the moment we start it, even if every
        // measurement afterwards fails.
        if state.ensure_database(database) {
            self.checkpoint.save(state)?;
        }

        let measurements = match self.source.list_measurements(database).await {
            Ok(measurements) => measurements,
            Err(e) => {
                let message = e.to_string();
                warn!(database, error = %message, "measurement discovery failed");
                self.reporter.event(ProgressEvent::DatabaseFailed {
                    database: database.to_string(),
                    message: message.clone(),
                });
                return Ok(DatabaseReport {
                    database: database.to_string(),
                    outcome: DatabaseOutcome::Failed(message),
                    measurements: Vec::new(),
                });
            }
        };

        if let Err(e) = self.destination.create_database(database).await {
            let message = e.to_string();
            warn!(database, error = %message, "destination creation failed");
            self.reporter.event(ProgressEvent::DatabaseFailed {
                database: database.to_string(),
                message: message.clone(),
            });
            return Ok(DatabaseReport {
                database: database.to_string(),
                outcome: DatabaseOutcome::Failed(message),
                measurements: Vec::new(),
            });
        }
        self.reporter.event(ProgressEvent::DatabaseCreated {
            database: database.to_string(),
        });

        let mut reports = Vec::with_capacity(measurements.len());
        for measurement in &measurements {
            if self.is_cancelled() {
                break;
            }
            let outcome = self
                .migrate_measurement(database, measurement, state)
                .await?;
            reports.push(MeasurementReport {
                measurement: measurement.clone(),
                outcome,
            });
        }

        // A database completes even when it contains failed measurements;
        // those stay visible through their checkpoint status.
        self.reporter.event(ProgressEvent::DatabaseCompleted {
            database: database.to_string(),
        });
        Ok(DatabaseReport {
            database: database.to_string(),
            outcome: DatabaseOutcome::Completed,
            measurements: reports,
        })
    }

    /// Transfer one measurement, honoring the checkpoint.
    ///
    /// Returns `Err` only for checkpoint failures; transfer failures are
    /// recorded and folded into the outcome.
    async fn migrate_measurement(
        &self,
        database: &str,
        measurement: &str,
        state: &mut MigrationState,
    ) -> Result<MeasurementOutcome> {
        if state.status(database, measurement).is_done() {
            debug!(database, measurement, "already done, skipping");
            self.reporter.event(ProgressEvent::MeasurementSkipped {
                database: database.to_string(),
                measurement: measurement.to_string(),
            });
            return Ok(MeasurementOutcome::Skipped);
        }

        self.reporter.event(ProgressEvent::MeasurementStarted {
            database: database.to_string(),
            measurement: measurement.to_string(),
        });

        match self.transfer(database, measurement).await {
            Ok((points, chunks)) => {
                state.mark_done(database, measurement);
                self.checkpoint.save(state)?;
                self.reporter.event(ProgressEvent::MeasurementMigrated {
                    database: database.to_string(),
                    measurement: measurement.to_string(),
                    points,
                    chunks,
                });
                Ok(MeasurementOutcome::Succeeded)
            }
            Err(MigrateError::Cancelled) => {
                // Leave the status untouched so the next run retries this
                // measurement from scratch.
                debug!(database, measurement, "transfer interrupted by cancel");
                Ok(MeasurementOutcome::Failed(
                    MigrateError::Cancelled.to_string(),
                ))
            }
            Err(e) => {
                let message = e.to_string();
                state.mark_failed(database, measurement, message.clone());
                self.checkpoint.save(state)?;
                self.reporter.event(ProgressEvent::MeasurementFailed {
                    database: database.to_string(),
                    measurement: measurement.to_string(),
                    message: message.clone(),
                });
                Ok(MeasurementOutcome::Failed(message))
            }
        }
    }

    /// Query, project, chunk, and write one measurement.
    ///
    /// Chunks are dispatched concurrently up to `write_fanout`; the
    /// measurement only reaches a terminal state once every chunk has
    /// landed (or one has failed). On retry after a partial failure some
    /// chunks are written again: the write guarantee is at-least-once.
    async fn transfer(&self, database: &str, measurement: &str) -> Result<(u64, usize)> {
        let rows = self.source.query_points(database, measurement).await?;

        let points = rows
            .into_iter()
            .map(|row| Point::from_row(measurement, row))
            .collect::<Result<Vec<_>>>()?;

        let chunk_count = points.len().div_ceil(self.options.chunk_size);
        debug!(
            database,
            measurement,
            points = points.len(),
            chunks = chunk_count,
            "transferring"
        );

        let cancelled = &self.cancelled;
        let written = stream::iter(points.chunks(self.options.chunk_size))
            // Once cancellation is requested no new chunk write starts;
            // writes already in the buffer run to completion.
            .take_while(|_| {
                futures::future::ready(!cancelled.load(Ordering::SeqCst))
            })
            .map(|chunk| self.destination.write_points(database, chunk))
            .buffer_unordered(self.options.write_fanout)
            .try_collect::<Vec<()>>()
            .await?;

        if written.len() < chunk_count {
            return Err(MigrateError::Cancelled);
        }

        Ok((points.len() as u64, chunk_count))
    }
}

/// Cheap cloneable handle that raises the engine's cancel flag
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
