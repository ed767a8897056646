//! AsyncIO embedded server
//!
//! Hosts applications whose responses are rendered by blocking or async
//! entity writers, with entities produced either on the request task or on a
//! worker thread.

pub mod app;
pub mod resource;
pub mod server;
pub mod writer;

pub use app::{Application, AsyncIoApp, Deployment, DeploymentContext, Providers, Resource};
pub use resource::AsyncIoResource;
pub use server::EmbeddedServer;
pub use writer::{
    AsyncEntityWriter, AsyncSink, AsyncWriter, AsyncWriterData, BlockingEntityWriter,
    BlockingSink, BlockingWriter, BlockingWriterData,
};

use asyncio_common::ServerConfig;

/// Serve the stock application until `shutdown` resolves.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()>,
{
    let mut server = EmbeddedServer::new(config);
    server.deploy(&AsyncIoApp::new(server.config()));
    server.start().await?;
    shutdown.await;
    server.stop().await?;
    Ok(())
}
