//! Error types for the AsyncIO server

use thiserror::Error;

/// Result type alias using the AsyncIO Error
pub type Result<T> = std::result::Result<T, Error>;

/// AsyncIO error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Server already started on {0}")]
    AlreadyStarted(String),

    #[error("Server is not running")]
    NotRunning,

    #[error("No application deployed at {0}")]
    NotDeployed(String),

    #[error("No writer registered for {0}")]
    NoWriter(&'static str),

    #[error("Worker thread failed: {0}")]
    Worker(String),

    #[error("Shutdown timed out after {seconds}s")]
    ShutdownTimeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the peer went away mid-response.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe
        )
    }
}
