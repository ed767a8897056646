//! Server management - starting the embedded server in-process

use std::net::SocketAddr;
use tracing::info;

use asyncio_common::{PortProvider, ServerConfig};
use asyncio_web::{Application, EmbeddedServer};

use crate::error::{E2eError, E2eResult};

/// Handle to a running embedded server
pub struct ServerHandle {
    server: EmbeddedServer,
    addr: SocketAddr,
    urls: PortProvider,
}

impl ServerHandle {
    /// Start a server and deploy `app` into it
    pub async fn start<A: Application + ?Sized>(config: ServerConfig, app: &A) -> E2eResult<Self> {
        let mut server = EmbeddedServer::new(config);
        let addr = server.start().await.map_err(E2eError::ServerStartup)?;
        server.deploy(app);

        info!("Server is ready at http://{}", addr);
        Ok(Self {
            server,
            addr,
            urls: PortProvider::for_addr(addr),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> String {
        self.urls.generate_base_url()
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        self.urls.generate_url(path)
    }

    pub fn server(&self) -> &EmbeddedServer {
        &self.server
    }

    /// Stop the server
    pub async fn stop(mut self) -> E2eResult<()> {
        info!("Stopping server at {}", self.addr);
        self.server.stop().await.map_err(E2eError::ServerShutdown)
    }
}
