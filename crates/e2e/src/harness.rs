//! Test harness - one server, one application, one client

use tracing::{debug, info};

use asyncio_common::ServerConfig;
use asyncio_web::{Application, AsyncIoApp};

use crate::assertions::{assert_body, EXPECTED_BODY};
use crate::client::HttpClient;
use crate::error::E2eResult;
use crate::server::ServerHandle;

/// Endpoints whose entity is produced on a worker thread
pub const WORKER_THREAD_ENDPOINTS: [&str; 3] = [
    "/async-io/blocking-writer-on-worker-thread",
    "/async-io/async-writer-on-worker-thread",
    "/async-io/slow-async-writer-on-worker-thread",
];

/// Endpoints whose entity is produced on the request task
pub const IO_THREAD_ENDPOINTS: [&str; 3] = [
    "/async-io/blocking-writer-on-io-thread",
    "/async-io/async-writer-on-io-thread",
    "/async-io/slow-async-writer-on-io-thread",
];

pub struct TestHarness {
    server: ServerHandle,
    client: HttpClient,
}

impl TestHarness {
    /// Start a server with the stock `async-io` application deployed
    pub async fn start(config: ServerConfig) -> E2eResult<Self> {
        let app = AsyncIoApp::new(&config);
        Self::start_with(config, &app).await
    }

    pub async fn start_with<A: Application + ?Sized>(
        config: ServerConfig,
        app: &A,
    ) -> E2eResult<Self> {
        let server = ServerHandle::start(config, app).await?;
        let client = HttpClient::new()?;
        Ok(Self { server, client })
    }

    pub fn server(&self) -> &ServerHandle {
        &self.server
    }

    pub fn client_mut(&mut self) -> &mut HttpClient {
        &mut self.client
    }

    /// GET `path` on the harness server and return the body
    pub async fn get_text(&self, path: &str) -> E2eResult<String> {
        self.client.target(self.server.url(path))?.get_text().await
    }

    /// GET `path` and require the body to be exactly `OK`
    pub async fn expect_ok(&self, path: &str) -> E2eResult<()> {
        let body = self.get_text(path).await?;
        assert_body(EXPECTED_BODY, &body)
    }

    /// Close the client, ignoring any failure, then stop the server.
    pub async fn shutdown(mut self) -> E2eResult<()> {
        if let Err(e) = self.client.close() {
            debug!("ignoring client close failure: {}", e);
        }
        self.server.stop().await?;
        info!("Harness shut down");
        Ok(())
    }
}

/// Install a test subscriber once; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
