//! InfluxDB v1 HTTP client
//!
//! Speaks the `/query` and `/write` endpoints: JSON query responses in,
//! line protocol out. Server error messages are passed through verbatim so
//! they survive into the checkpoint's `Failed` payloads.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::TimeSeriesStore;
use crate::config::HostPort;
use crate::error::{MigrateError, Result};
use crate::point::{FieldValue, Point, Row};

/// Client for one InfluxDB v1 endpoint
pub struct InfluxStore {
    base: String,
    client: Client,
}

impl InfluxStore {
    pub fn new(addr: &HostPort) -> Self {
        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    /// Run a query statement and return its first result.
    async fn query(&self, statement: &str, database: Option<&str>) -> Result<StatementResult> {
        debug!(statement, database, "influx query");

        let mut params = vec![("q", statement.to_string()), ("epoch", "ns".to_string())];
        if let Some(db) = database {
            params.push(("db", db.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/query", self.base))
            .query(&params)
            .send()
            .await
            .map_err(|e| MigrateError::Discovery(format!("{}: {e}", self.base)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MigrateError::Discovery(format!("{}: {e}", self.base)))?;

        let parsed: QueryResponse = serde_json::from_str(&body).map_err(|e| {
            MigrateError::Discovery(format!("{}: unexpected response ({e})", self.base))
        })?;

        if let Some(message) = parsed.error {
            return Err(MigrateError::Discovery(message));
        }
        if !status.is_success() {
            return Err(MigrateError::Discovery(format!(
                "{}: HTTP {status}",
                self.base
            )));
        }

        let result = parsed
            .results
            .into_iter()
            .next()
            .unwrap_or_default();
        if let Some(message) = result.error {
            return Err(MigrateError::Discovery(message));
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        let result = self.query("SHOW DATABASES", None).await?;
        Ok(first_column_names(result))
    }

    async fn list_measurements(&self, database: &str) -> Result<Vec<String>> {
        let result = self
            .query("SHOW MEASUREMENTS", Some(database))
            .await?;
        Ok(first_column_names(result))
    }

    async fn query_points(&self, database: &str, measurement: &str) -> Result<Vec<Row>> {
        let statement = format!("SELECT * FROM \"{}\"", escape_identifier(measurement));
        let result = self
            .query(&statement, Some(database))
            .await
            .map_err(transfer_scope)?;
        Ok(series_to_rows(result))
    }

    async fn create_database(&self, database: &str) -> Result<()> {
        let statement = format!("CREATE DATABASE \"{}\"", escape_identifier(database));
        match self.query(&statement, None).await {
            Ok(_) => Ok(()),
            // CREATE DATABASE is idempotent on InfluxDB v1, but be
            // tolerant of servers that report the duplicate instead.
            Err(MigrateError::Discovery(message))
                if message.contains("already exists") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn write_points(&self, database: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        debug!(database, points = points.len(), "influx write");

        let response = self
            .client
            .post(format!("{}/write", self.base))
            .query(&[("db", database), ("precision", "ns")])
            .body(body)
            .send()
            .await
            .map_err(|e| MigrateError::Transfer(format!("{}: {e}", self.base)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<WriteError>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        Err(MigrateError::Transfer(message))
    }
}

/// Reclassify a discovery-shaped client error as a transfer error; point
/// queries fail at measurement scope, not database scope.
fn transfer_scope(e: MigrateError) -> MigrateError {
    match e {
        MigrateError::Discovery(message) => MigrateError::Transfer(message),
        other => other,
    }
}

/// Escape quotes in an identifier interpolated into InfluxQL.
fn escape_identifier(name: &str) -> String {
    name.replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<FieldValue>>,
}

#[derive(Debug, Deserialize)]
struct WriteError {
    error: String,
}

/// Flatten a single-column series (SHOW DATABASES / SHOW MEASUREMENTS)
/// into its names, preserving server order.
fn first_column_names(result: StatementResult) -> Vec<String> {
    result
        .series
        .into_iter()
        .flat_map(|s| s.values)
        .filter_map(|mut row| match row.drain(..).next() {
            Some(FieldValue::Text(name)) => Some(name),
            _ => None,
        })
        .collect()
}

/// Zip series columns with each value row into column-keyed rows.
fn series_to_rows(result: StatementResult) -> Vec<Row> {
    let mut rows = Vec::new();
    for series in result.series {
        for values in series.values {
            let row: Row = series
                .columns
                .iter()
                .cloned()
                .zip(values)
                .collect();
            rows.push(row);
        }
    }
    rows
}
