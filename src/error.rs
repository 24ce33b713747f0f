//! Error types for influx-migrate
//!
//! One error type covers the whole migration pipeline. The distinction
//! between variants matters for containment: `Transfer` errors are recorded
//! against a single measurement and never abort the run, `Discovery` errors
//! abort one scope (a database, or the run when listing databases fails),
//! and `Config`/`Checkpoint` errors are fatal.

use thiserror::Error;

/// Main error type for migration operations
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Invalid configuration (malformed addresses, bad pattern)
    #[error("configuration error: {0}")]
    Config(String),

    /// Listing databases or measurements failed
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Querying or writing a measurement's points failed
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Reading or writing the checkpoint file failed
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The run was cancelled cooperatively
    #[error("migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Whether this error is contained to a single measurement.
    pub fn is_transfer(&self) -> bool {
        matches!(self, MigrateError::Transfer(_))
    }
}

/// Migration result type
pub type Result<T> = std::result::Result<T, MigrateError>;
