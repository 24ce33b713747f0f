//! Field values, query rows, and write-ready points
//!
//! A [`Row`] is a raw query result keyed by column name, including the
//! `time` column. [`Point::from_row`] projects it into a write-ready record:
//! the `time` column is promoted to a dedicated timestamp and never carried
//! into the field mapping, and null-valued columns are dropped entirely.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// A timestamp in nanoseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a timestamp from nanoseconds since Unix epoch
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Get timestamp as nanoseconds
    pub fn as_nanos(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single column value as returned by the source store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer field
    Integer(i64),
    /// Float field
    Float(f64),
    /// Boolean field
    Boolean(bool),
    /// String field (tags surface as strings too)
    Text(String),
    /// Null / absent marker; dropped during projection
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Interpret the value as a nanosecond timestamp, if possible.
    fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Integer(n) => Some(Timestamp(*n)),
            // serde_json parses large epoch values as f64 when they carry
            // a fractional part; accept them if they fit losslessly.
            FieldValue::Float(f) if f.fract() == 0.0 => Some(Timestamp(*f as i64)),
            _ => None,
        }
    }
}

/// One raw query result row, keyed by column name (`time` included)
pub type Row = BTreeMap<String, FieldValue>;

/// Column name the source uses for the point timestamp.
pub const TIME_COLUMN: &str = "time";

/// A write-ready record: timestamp, measurement, and non-null fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Measurement this point belongs to
    pub measurement: String,
    /// Timestamp in nanoseconds
    pub timestamp: Timestamp,
    /// Field values; never contains `time` or nulls
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    /// Project a raw row into a write-ready point.
    ///
    /// A row whose columns are all null (besides `time`) still yields a
    /// valid point with an empty field mapping.
    pub fn from_row(measurement: &str, mut row: Row) -> Result<Self> {
        let time = row.remove(TIME_COLUMN).ok_or_else(|| {
            MigrateError::Transfer(format!(
                "row in measurement '{measurement}' has no '{TIME_COLUMN}' column"
            ))
        })?;
        let timestamp = time.as_timestamp().ok_or_else(|| {
            MigrateError::Transfer(format!(
                "row in measurement '{measurement}' has a non-numeric '{TIME_COLUMN}' column"
            ))
        })?;

        row.retain(|_, value| !value.is_null());

        Ok(Self {
            measurement: measurement.to_string(),
            timestamp,
            fields: row,
        })
    }

    /// Encode this point as one InfluxDB line-protocol line.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        line.push(' ');

        if self.fields.is_empty() {
            // Line protocol cannot express a field-less point; a placeholder
            // field keeps the timestamp-only record representable.
            line.push_str("__empty__=true");
        } else {
            let mut first = true;
            for (key, value) in &self.fields {
                if !first {
                    line.push(',');
                }
                first = false;
                line.push_str(&escape_key(key));
                line.push('=');
                match value {
                    FieldValue::Integer(n) => {
                        let _ = write!(line, "{n}i");
                    }
                    FieldValue::Float(f) => {
                        let _ = write!(line, "{f}");
                    }
                    FieldValue::Boolean(b) => {
                        let _ = write!(line, "{b}");
                    }
                    FieldValue::Text(s) => {
                        line.push('"');
                        line.push_str(&s.replace('\\', "\\\\").replace('"', "\\\""));
                        line.push('"');
                    }
                    FieldValue::Null => unreachable!("nulls are dropped during projection"),
                }
            }
        }

        let _ = write!(line, " {}", self.timestamp.as_nanos());
        line
    }
}

/// Escape a measurement name for line protocol (commas and spaces).
fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape a field key for line protocol (commas, spaces, equals).
fn escape_key(key: &str) -> String {
    key.replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('=', "\\=")
}
