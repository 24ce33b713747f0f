//! Abstract time-series store capability
//!
//! Both the source and the destination of a migration are instances of the
//! same capability: list databases, list measurements, read all points of a
//! measurement, create a database, write a batch of points. The engine only
//! ever talks to this trait; the wire protocol lives in the implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::point::{Point, Row};

pub mod influx;

pub use influx::InfluxStore;

/// A time-series store reachable over the network
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// List all database names, in the store's reported order.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// List all measurement names of a database, in the store's order.
    async fn list_measurements(&self, database: &str) -> Result<Vec<String>>;

    /// Read every point of a measurement as raw rows (the `time` column
    /// included).
    async fn query_points(&self, database: &str, measurement: &str) -> Result<Vec<Row>>;

    /// Create a database. Must be idempotent: an already-existing database
    /// is success.
    async fn create_database(&self, database: &str) -> Result<()>;

    /// Write one batch of points into a database.
    async fn write_points(&self, database: &str, points: &[Point]) -> Result<()>;
}
