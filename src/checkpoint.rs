//! Checkpointed migration state
//!
//! The checkpoint is a single JSON document with a top-level `state` key
//! mapping database name → measurement name → status. It is read in full at
//! startup and rewritten in full after every state transition, so no
//! in-memory-only progress survives a restart.
//!
//! Wire format matches the original checkpoint files this tool resumes
//! from: a completed measurement is stored as the boolean `true`, a failed
//! one as its error message string. Pending measurements are absent.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

// ---------------------------------------------------------------------------
// Measurement status
// ---------------------------------------------------------------------------

/// Status of one (database, measurement) unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeasurementStatus {
    /// Never attempted (or attempt interrupted before a terminal state)
    Pending,
    /// Migrated successfully; terminal, skipped on re-runs
    Done,
    /// Last attempt failed with this message; retried on the next run
    Failed(String),
}

impl MeasurementStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, MeasurementStatus::Done)
    }
}

impl Serialize for MeasurementStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MeasurementStatus::Pending => serializer.serialize_none(),
            MeasurementStatus::Done => serializer.serialize_bool(true),
            MeasurementStatus::Failed(message) => serializer.serialize_str(message),
        }
    }
}

impl<'de> Deserialize<'de> for MeasurementStatus {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct StatusVisitor;

        impl<'de> Visitor<'de> for StatusVisitor {
            type Value = MeasurementStatus;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("true, an error message string, or null")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
                if v {
                    Ok(MeasurementStatus::Done)
                } else {
                    Ok(MeasurementStatus::Pending)
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(MeasurementStatus::Failed(v.to_string()))
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(MeasurementStatus::Pending)
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(MeasurementStatus::Pending)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

// ---------------------------------------------------------------------------
// Migration state
// ---------------------------------------------------------------------------

/// Full migration state: database → measurement → status.
///
/// A database key exists as soon as the database is first observed; an
/// empty inner map is valid and distinct from an unseen database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationState {
    entries: BTreeMap<String, BTreeMap<String, MeasurementStatus>>,
}

impl MigrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a database entry exists. Returns true if it was created,
    /// meaning the caller must persist the state.
    pub fn ensure_database(&mut self, database: &str) -> bool {
        if self.entries.contains_key(database) {
            false
        } else {
            self.entries.insert(database.to_string(), BTreeMap::new());
            true
        }
    }

    /// Whether a database has been observed before.
    pub fn contains_database(&self, database: &str) -> bool {
        self.entries.contains_key(database)
    }

    /// Status of a measurement; absence means `Pending`.
    pub fn status(&self, database: &str, measurement: &str) -> MeasurementStatus {
        self.entries
            .get(database)
            .and_then(|m| m.get(measurement))
            .cloned()
            .unwrap_or(MeasurementStatus::Pending)
    }

    /// Record a successful migration. Overwrites any previous failure.
    pub fn mark_done(&mut self, database: &str, measurement: &str) {
        self.entries
            .entry(database.to_string())
            .or_default()
            .insert(measurement.to_string(), MeasurementStatus::Done);
    }

    /// Record a failed attempt with its error message, verbatim.
    pub fn mark_failed(&mut self, database: &str, measurement: &str, message: String) {
        self.entries
            .entry(database.to_string())
            .or_default()
            .insert(
                measurement.to_string(),
                MeasurementStatus::Failed(message),
            );
    }

    /// Measurements recorded for a database, in name order.
    pub fn measurements(&self, database: &str) -> Vec<(&str, &MeasurementStatus)> {
        self.entries
            .get(database)
            .map(|m| m.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Checkpoint store
// ---------------------------------------------------------------------------

/// Durable backing for the migration state.
///
/// Read once at startup, written in full after every mutation. The engine
/// is the only writer during a run.
pub trait CheckpointStore: Send + Sync {
    /// Load the full state; a missing checkpoint yields an empty state.
    fn load(&self) -> Result<MigrationState>;

    /// Persist the full state.
    fn save(&self, state: &MigrationState) -> Result<()>;

    /// Remove any persisted state (the `--clean` operation).
    fn clear(&self) -> Result<()>;
}

/// On-disk document shape: `{"state": {...}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointDocument {
    #[serde(default)]
    state: MigrationState,
}

/// File-backed checkpoint store holding a single JSON document.
pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileCheckpoint {
    fn load(&self) -> Result<MigrationState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MigrationState::new());
            }
            Err(e) => {
                return Err(MigrateError::Checkpoint(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let doc: CheckpointDocument = serde_json::from_str(&raw).map_err(|e| {
            MigrateError::Checkpoint(format!(
                "failed to parse {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(doc.state)
    }

    fn save(&self, state: &MigrationState) -> Result<()> {
        let doc = CheckpointDocument {
            state: state.clone(),
        };
        let raw = serde_json::to_string_pretty(&doc)
            .map_err(|e| MigrateError::Checkpoint(format!("failed to encode state: {e}")))?;

        // Write-then-rename so an interrupted save never truncates the
        // previous checkpoint.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| {
            MigrateError::Checkpoint(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            MigrateError::Checkpoint(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MigrateError::Checkpoint(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
