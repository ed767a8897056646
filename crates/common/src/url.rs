//! Test URL generation
//!
//! Builds absolute URLs against the configured host and port so that tests
//! and tools agree on where the embedded server lives.

use std::net::SocketAddr;

use crate::config::{parse_port, DEFAULT_PORT, HOST_ENV, PORT_ENV};
use crate::error::Result;

/// Host and port pair used to build request URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProvider {
    host: String,
    port: u16,
}

impl PortProvider {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Read `ASYNCIO_HOST` / `ASYNCIO_PORT`, defaulting to `localhost:8081`.
    /// An unparsable `ASYNCIO_PORT` is an `InvalidConfig` error, as in
    /// [`ServerConfig::with_env_overrides`](crate::ServerConfig::with_env_overrides).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var(HOST_ENV).ok().as_deref(),
            std::env::var(PORT_ENV).ok().as_deref(),
        )
    }

    /// Same as [`from_env`](Self::from_env) with explicit values; blank values
    /// count as unset.
    pub fn from_vars(host: Option<&str>, port: Option<&str>) -> Result<Self> {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        let port = match port.map(str::trim).filter(|p| !p.is_empty()) {
            Some(port) => parse_port(port)?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }

    /// Provider pointing at an already bound address
    pub fn for_addr(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://<host>:<port>`
    pub fn generate_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `http://<host>:<port><path>`
    pub fn generate_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.generate_base_url(), path)
        } else {
            format!("{}/{}", self.generate_base_url(), path)
        }
    }
}
