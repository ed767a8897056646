//! Server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the listen host
pub const HOST_ENV: &str = "ASYNCIO_HOST";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "ASYNCIO_PORT";

/// Port used when nothing else is configured
pub const DEFAULT_PORT: u16 = 8081;

/// Parse a port override. Surrounding whitespace is ignored.
pub fn parse_port(value: &str) -> Result<u16> {
    let value = value.trim();
    value
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid port: {}", value)))
}

/// Embedded server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,

    /// Listen port (0 = ephemeral)
    pub port: u16,

    /// Number of body chunks buffered between a writer and the connection
    pub body_channel_capacity: usize,

    /// Pause between the two halves of a slow async write
    pub slow_write_delay_ms: u64,

    /// How long `stop` waits for in-flight requests
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            body_channel_capacity: 16,
            slow_write_delay_ms: 200,
            shutdown_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Config bound to an ephemeral port on loopback, as used by tests.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Default::default()
        }
    }

    /// Load configuration from file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            debug!("config file {} not found, using defaults", path.display());
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `ASYNCIO_HOST` / `ASYNCIO_PORT` overrides from the process environment.
    /// An unparsable `ASYNCIO_PORT` is an `InvalidConfig` error, as in
    /// [`PortProvider::from_env`](crate::url::PortProvider::from_env).
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(
            std::env::var(HOST_ENV).ok().as_deref(),
            std::env::var(PORT_ENV).ok().as_deref(),
        )
    }

    /// Apply host/port overrides; blank values are ignored.
    pub fn with_overrides(mut self, host: Option<&str>, port: Option<&str>) -> Result<Self> {
        if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
            self.host = host.to_string();
        }
        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            self.port = parse_port(port)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.body_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "body_channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("invalid listen address {}: {}", self.host, e)))
    }

    pub fn slow_write_delay(&self) -> Duration {
        Duration::from_millis(self.slow_write_delay_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_save_then_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/server.toml");

        let config = ServerConfig {
            port: 9100,
            slow_write_delay_ms: 50,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap(), config);

        std::fs::write(&path, "port = 9200\n").unwrap();
        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.port, 9200);
        assert_eq!(loaded.body_channel_capacity, 16);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "body_channel_capacity = 0\n").unwrap();
        assert!(matches!(
            ServerConfig::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::default()
            .with_overrides(Some("0.0.0.0"), Some(" 9000 "))
            .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);

        let unchanged = ServerConfig::default().with_overrides(Some(""), None).unwrap();
        assert_eq!(unchanged, ServerConfig::default());

        assert!(ServerConfig::default()
            .with_overrides(None, Some("http"))
            .is_err());
    }

    #[test]
    fn test_listen_addr_maps_localhost() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 0,
            ..Default::default()
        };
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:0");
    }
}
