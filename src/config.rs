//! Migration run configuration
//!
//! Addresses are validated up front so a malformed `host:port` fails before
//! any network call is made.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::MigrateError;

/// Default maximum number of points per write chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Default number of chunk writes in flight per measurement.
pub const DEFAULT_WRITE_FANOUT: usize = 4;

/// Default checkpoint file, relative to the working directory.
pub const DEFAULT_CHECKPOINT_PATH: &str = ".migrate-state.json";

/// A validated `host:port` address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
    /// Hostname or IP
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl HostPort {
    /// Parse a `host:port` string. `role` names the side being parsed
    /// ("source" or "destination") so the usage message is specific.
    pub fn parse(raw: &str, role: &str) -> Result<Self, MigrateError> {
        let (host, port) = raw.split_once(':').ok_or_else(|| {
            MigrateError::Config(format!(
                "invalid {role} address '{raw}' (please provide host:port)"
            ))
        })?;

        if host.is_empty() {
            return Err(MigrateError::Config(format!(
                "invalid {role} address '{raw}' (empty host)"
            )));
        }

        let port = port.parse::<u16>().map_err(|_| {
            MigrateError::Config(format!(
                "invalid {role} address '{raw}' (port must be 1-65535)"
            ))
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Migration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Source cluster address
    pub source: HostPort,
    /// Destination cluster address
    pub destination: HostPort,
    /// Optional regex filter on database names (substring match)
    pub pattern: Option<String>,
    /// Maximum points per write chunk
    pub chunk_size: usize,
    /// Chunk writes in flight per measurement
    pub write_fanout: usize,
    /// Checkpoint file path
    pub checkpoint_path: PathBuf,
    /// Clear the checkpoint before running
    pub clean: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            source: HostPort {
                host: "127.0.0.1".to_string(),
                port: 8086,
            },
            destination: HostPort {
                host: "127.0.0.1".to_string(),
                port: 9086,
            },
            pattern: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_fanout: DEFAULT_WRITE_FANOUT,
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
            clean: false,
        }
    }
}

impl MigrateConfig {
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.chunk_size == 0 {
            return Err(MigrateError::Config(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.write_fanout == 0 {
            return Err(MigrateError::Config(
                "write_fanout must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port_parse() {
        let hp = HostPort::parse("127.0.0.1:8086", "source").unwrap();
        assert_eq!(hp.host, "127.0.0.1");
        assert_eq!(hp.port, 8086);
        assert_eq!(hp.to_string(), "127.0.0.1:8086");
    }

    #[test]
    fn test_host_port_rejects_missing_port() {
        let err = HostPort::parse("localhost", "source").unwrap_err();
        assert!(err.to_string().contains("host:port"));
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn test_host_port_rejects_bad_port() {
        assert!(HostPort::parse("localhost:http", "destination").is_err());
        assert!(HostPort::parse("localhost:99999", "destination").is_err());
        assert!(HostPort::parse(":8086", "destination").is_err());
    }

    #[test]
    fn test_config_validate() {
        let mut config = MigrateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 5000);

        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
