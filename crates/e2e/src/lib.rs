//! AsyncIO E2E Test Framework
//!
//! This crate drives the embedded server over real HTTP:
//! - Starts the server in-process and deploys an application
//! - Issues GET requests with a closeable client
//! - Compares response bodies byte-for-byte
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestHarness                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ServerHandle::start(config, app) -> EmbeddedServer         │
//! │  HttpClient::target(url).get_text() -> String               │
//! │  assert_body(expected, actual)                              │
//! │  shutdown(): close client (errors ignored), stop server     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod client;
pub mod error;
pub mod harness;
pub mod server;

pub use client::HttpClient;
pub use error::{E2eError, E2eResult};
pub use harness::TestHarness;
pub use server::ServerHandle;
