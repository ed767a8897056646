//! The `async-io` resource
//!
//! Every endpoint answers `OK`. They differ in where the entity is produced
//! (the request task or a worker thread) and which writer renders it.

use axum::{extract::State, response::Response, routing::get, Router};
use tracing::debug;

use asyncio_common::{Error, Result};

use crate::app::{error_response, DeploymentContext, Resource};
use crate::writer::{AsyncWriterData, BlockingWriterData};

pub const BLOCKING_WRITER_ON_WORKER_THREAD: &str = "/blocking-writer-on-worker-thread";
pub const ASYNC_WRITER_ON_WORKER_THREAD: &str = "/async-writer-on-worker-thread";
pub const SLOW_ASYNC_WRITER_ON_WORKER_THREAD: &str = "/slow-async-writer-on-worker-thread";
pub const BLOCKING_WRITER_ON_IO_THREAD: &str = "/blocking-writer-on-io-thread";
pub const ASYNC_WRITER_ON_IO_THREAD: &str = "/async-writer-on-io-thread";
pub const SLOW_ASYNC_WRITER_ON_IO_THREAD: &str = "/slow-async-writer-on-io-thread";

/// Resource mounted at `/async-io`
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncIoResource;

impl AsyncIoResource {
    pub const PATH: &'static str = "/async-io";
}

impl Resource for AsyncIoResource {
    fn path(&self) -> &str {
        Self::PATH
    }

    fn routes(&self) -> Router<DeploymentContext> {
        Router::new()
            .route(BLOCKING_WRITER_ON_WORKER_THREAD, get(blocking_writer_on_worker_thread))
            .route(ASYNC_WRITER_ON_WORKER_THREAD, get(async_writer_on_worker_thread))
            .route(SLOW_ASYNC_WRITER_ON_WORKER_THREAD, get(slow_async_writer_on_worker_thread))
            .route(BLOCKING_WRITER_ON_IO_THREAD, get(blocking_writer_on_io_thread))
            .route(ASYNC_WRITER_ON_IO_THREAD, get(async_writer_on_io_thread))
            .route(SLOW_ASYNC_WRITER_ON_IO_THREAD, get(slow_async_writer_on_io_thread))
    }
}

/// Produce a value on a blocking-pool thread and resume the request task
/// once it completes.
pub async fn on_worker_thread<T, F>(produce: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        debug!(
            "producing entity on {:?}",
            std::thread::current().name().unwrap_or("unnamed")
        );
        produce()
    })
    .await
    .map_err(|e| Error::Worker(e.to_string()))
}

async fn render_from_worker<T, F>(ctx: DeploymentContext, produce: F) -> Response
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match on_worker_thread(produce).await {
        Ok(entity) => ctx.render(entity),
        Err(e) => error_response(&e),
    }
}

async fn blocking_writer_on_worker_thread(State(ctx): State<DeploymentContext>) -> Response {
    render_from_worker(ctx, || BlockingWriterData).await
}

async fn async_writer_on_worker_thread(State(ctx): State<DeploymentContext>) -> Response {
    render_from_worker(ctx, AsyncWriterData::default).await
}

async fn slow_async_writer_on_worker_thread(State(ctx): State<DeploymentContext>) -> Response {
    render_from_worker(ctx, AsyncWriterData::slow).await
}

async fn blocking_writer_on_io_thread(State(ctx): State<DeploymentContext>) -> Response {
    ctx.render(BlockingWriterData)
}

async fn async_writer_on_io_thread(State(ctx): State<DeploymentContext>) -> Response {
    ctx.render(AsyncWriterData::default())
}

async fn slow_async_writer_on_io_thread(State(ctx): State<DeploymentContext>) -> Response {
    ctx.render(AsyncWriterData::slow())
}
