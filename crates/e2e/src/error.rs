//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(#[source] asyncio_common::Error),

    #[error("Server failed to stop: {0}")]
    ServerShutdown(#[source] asyncio_common::Error),

    #[error("Client is closed")]
    ClientClosed,

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Assertion failed: expected {expected:?}, got {actual:?}")]
    AssertionFailed { expected: String, actual: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
