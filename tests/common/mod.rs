//! Shared test doubles: an in-memory time-series store that records every
//! call and can inject failures, an in-memory checkpoint store, and an
//! event-recording progress reporter.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use influx_migrate::{
    checkpoint::{CheckpointStore, MigrationState},
    error::{MigrateError, Result},
    point::{FieldValue, Point, Row},
    progress::{ProgressEvent, ProgressReporter},
    store::TimeSeriesStore,
};

// ---------------------------------------------------------------------------
// Mock store
// ---------------------------------------------------------------------------

/// Per-operation call counters
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub list_databases: usize,
    pub list_measurements: Vec<String>,
    pub queries: Vec<(String, String)>,
    pub creates: Vec<String>,
}

/// In-memory `TimeSeriesStore` with injectable failures
#[derive(Default)]
pub struct MockStore {
    databases: Vec<String>,
    measurements: HashMap<String, Vec<String>>,
    points: HashMap<(String, String), Vec<Row>>,

    fail_list_databases: Option<String>,
    fail_list_measurements: HashSet<String>,
    fail_query: HashSet<(String, String)>,
    fail_write: Mutex<HashSet<(String, String)>>,
    fail_create: HashSet<String>,

    calls: Mutex<CallLog>,
    writes: Mutex<Vec<(String, Vec<Point>)>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: &str, measurements: &[&str]) -> Self {
        self.databases.push(database.to_string());
        self.measurements.insert(
            database.to_string(),
            measurements.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_points(mut self, database: &str, measurement: &str, rows: Vec<Row>) -> Self {
        self.points
            .insert((database.to_string(), measurement.to_string()), rows);
        self
    }

    pub fn fail_list_databases(mut self, message: &str) -> Self {
        self.fail_list_databases = Some(message.to_string());
        self
    }

    pub fn fail_list_measurements(mut self, database: &str) -> Self {
        self.fail_list_measurements.insert(database.to_string());
        self
    }

    pub fn fail_query(mut self, database: &str, measurement: &str) -> Self {
        self.fail_query
            .insert((database.to_string(), measurement.to_string()));
        self
    }

    pub fn fail_write(self, database: &str, measurement: &str) -> Self {
        self.fail_write
            .lock()
            .insert((database.to_string(), measurement.to_string()));
        self
    }

    pub fn fail_create(mut self, database: &str) -> Self {
        self.fail_create.insert(database.to_string());
        self
    }

    /// Stop injecting a write failure (for retry scenarios).
    pub fn heal_write(&self, database: &str, measurement: &str) {
        self.fail_write
            .lock()
            .remove(&(database.to_string(), measurement.to_string()));
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.calls.lock().queries.len()
    }

    pub fn write_batches(&self) -> Vec<(String, Vec<Point>)> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }
}

#[async_trait]
impl TimeSeriesStore for MockStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.calls.lock().list_databases += 1;
        if let Some(message) = &self.fail_list_databases {
            return Err(MigrateError::Discovery(message.clone()));
        }
        Ok(self.databases.clone())
    }

    async fn list_measurements(&self, database: &str) -> Result<Vec<String>> {
        self.calls
            .lock()
            .list_measurements
            .push(database.to_string());
        if self.fail_list_measurements.contains(database) {
            return Err(MigrateError::Discovery(format!(
                "cannot list measurements of '{database}'"
            )));
        }
        Ok(self.measurements.get(database).cloned().unwrap_or_default())
    }

    async fn query_points(&self, database: &str, measurement: &str) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .queries
            .push((database.to_string(), measurement.to_string()));
        let key = (database.to_string(), measurement.to_string());
        if self.fail_query.contains(&key) {
            return Err(MigrateError::Transfer(format!(
                "query failed for '{database}'.'{measurement}'"
            )));
        }
        Ok(self.points.get(&key).cloned().unwrap_or_default())
    }

    async fn create_database(&self, database: &str) -> Result<()> {
        self.calls.lock().creates.push(database.to_string());
        if self.fail_create.contains(database) {
            return Err(MigrateError::Discovery(format!(
                "cannot create '{database}'"
            )));
        }
        Ok(())
    }

    async fn write_points(&self, database: &str, points: &[Point]) -> Result<()> {
        if let Some(point) = points.first() {
            let key = (database.to_string(), point.measurement.clone());
            if self.fail_write.lock().contains(&key) {
                return Err(MigrateError::Transfer(format!(
                    "write failed for '{database}'.'{}'",
                    point.measurement
                )));
            }
        }
        self.writes
            .lock()
            .push((database.to_string(), points.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory checkpoint
// ---------------------------------------------------------------------------

/// In-memory `CheckpointStore` that counts saves
#[derive(Default)]
pub struct MemoryCheckpoint {
    state: Mutex<MigrationState>,
    saves: AtomicUsize,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MigrationState {
        self.state.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&self) -> Result<MigrationState> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &MigrationState) -> Result<()> {
        *self.state.lock() = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.state.lock() = MigrationState::default();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording reporter
// ---------------------------------------------------------------------------

/// Reporter that records every event for assertions
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// Build a raw query row with a `time` column and the given fields.
pub fn row(time: i64, fields: &[(&str, FieldValue)]) -> Row {
    let mut row: Row = BTreeMap::new();
    row.insert("time".to_string(), FieldValue::Integer(time));
    for (name, value) in fields {
        row.insert(name.to_string(), value.clone());
    }
    row
}

/// Build `n` simple rows with ascending timestamps.
pub fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| row(i as i64, &[("value", FieldValue::Integer(i as i64))]))
        .collect()
}
