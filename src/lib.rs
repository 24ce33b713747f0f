//! # influx-migrate
//!
//! A resumable InfluxDB-to-InfluxDB migration tool. Data is copied database
//! by database and measurement by measurement; progress is checkpointed to
//! a JSON file after every state transition, so an interrupted run can be
//! restarted and will skip everything already completed.
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`planner`] | Ordered database selection with optional regex filter |
//! | [`engine`] | The checkpointed per-measurement transfer state machine |
//! | [`checkpoint`] | Durable `Pending / Done / Failed` state per unit |
//! | [`store`] | The time-series store capability and its HTTP client |
//! | [`point`] | Field projection and line-protocol encoding |
//! | [`progress`] | Lifecycle event reporting |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use influx_migrate::{
//!     checkpoint::JsonFileCheckpoint,
//!     config::HostPort,
//!     engine::{EngineOptions, MigrationEngine},
//!     progress::ConsoleReporter,
//!     store::InfluxStore,
//! };
//!
//! let source = Arc::new(InfluxStore::new(&HostPort::parse("127.0.0.1:8086", "source")?));
//! let dest = Arc::new(InfluxStore::new(&HostPort::parse("127.0.0.1:9086", "destination")?));
//! let checkpoint = Arc::new(JsonFileCheckpoint::new(".migrate-state.json"));
//!
//! let engine = MigrationEngine::new(
//!     source,
//!     dest,
//!     checkpoint,
//!     Arc::new(ConsoleReporter::new()),
//!     EngineOptions::default(),
//! );
//! let summary = engine.run(None).await?;
//! ```

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod planner;
pub mod point;
pub mod progress;
pub mod store;

pub use checkpoint::{CheckpointStore, JsonFileCheckpoint, MeasurementStatus, MigrationState};
pub use config::{HostPort, MigrateConfig};
pub use engine::{
    DatabaseOutcome, EngineOptions, MeasurementOutcome, MigrationEngine, RunSummary,
};
pub use error::{MigrateError, Result};
pub use planner::plan;
pub use point::{FieldValue, Point, Row, Timestamp};
pub use progress::{ConsoleReporter, NullReporter, ProgressEvent, ProgressReporter};
pub use store::{InfluxStore, TimeSeriesStore};
