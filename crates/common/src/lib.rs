//! AsyncIO Common Library
//!
//! Shared configuration, error types and URL helpers for the AsyncIO server
//! and its test harness.

pub mod config;
pub mod error;
pub mod url;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use url::PortProvider;

/// AsyncIO version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
