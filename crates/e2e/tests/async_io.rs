use async_trait::async_trait;
use futures::future::join_all;
use std::time::{Duration, Instant};

use asyncio_common::{Error, ServerConfig};
use asyncio_e2e::harness::{init_test_logging, IO_THREAD_ENDPOINTS, WORKER_THREAD_ENDPOINTS};
use asyncio_e2e::{E2eError, TestHarness};
use asyncio_web::{
    Application, AsyncEntityWriter, AsyncIoResource, AsyncSink, AsyncWriterData, BlockingWriter,
    Providers, Resource,
};

fn harness_config() -> ServerConfig {
    ServerConfig {
        slow_write_delay_ms: 100,
        ..ServerConfig::ephemeral()
    }
}

/// The three worker-thread endpoints each answer exactly `OK`, in order.
#[tokio::test(flavor = "multi_thread")]
async fn async_io_endpoints_answer_ok() {
    init_test_logging();
    let harness = TestHarness::start(harness_config()).await.unwrap();

    let val = harness
        .get_text("/async-io/blocking-writer-on-worker-thread")
        .await
        .unwrap();
    assert_eq!("OK", val);

    let val = harness
        .get_text("/async-io/async-writer-on-worker-thread")
        .await
        .unwrap();
    assert_eq!("OK", val);

    let val = harness
        .get_text("/async-io/slow-async-writer-on-worker-thread")
        .await
        .unwrap();
    assert_eq!("OK", val);

    harness.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn io_thread_endpoints_answer_ok() {
    init_test_logging();
    let harness = TestHarness::start(harness_config()).await.unwrap();

    for path in IO_THREAD_ENDPOINTS {
        harness.expect_ok(path).await.unwrap();
    }

    harness.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_writer_pauses_between_halves() {
    let harness = TestHarness::start(harness_config()).await.unwrap();

    let start = Instant::now();
    harness.expect_ok(WORKER_THREAD_ENDPOINTS[2]).await.unwrap();
    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "slow write finished in {:?}",
        start.elapsed()
    );

    harness.shutdown().await.unwrap();
}

/// Slow async writes suspend instead of holding a thread, so concurrent
/// slow requests overlap.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_writers_do_not_serialize() {
    let config = ServerConfig {
        slow_write_delay_ms: 300,
        ..ServerConfig::ephemeral()
    };
    let harness = TestHarness::start(config).await.unwrap();

    let start = Instant::now();
    let requests = (0..6).map(|_| harness.get_text(WORKER_THREAD_ENDPOINTS[2]));
    let bodies = join_all(requests).await;
    let elapsed = start.elapsed();

    for body in bodies {
        assert_eq!(body.unwrap(), "OK");
    }
    assert!(
        elapsed < Duration::from_millis(1500),
        "6 concurrent slow writes took {:?}",
        elapsed
    );

    harness.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_ignores_client_close_failure() {
    let mut harness = TestHarness::start(harness_config()).await.unwrap();
    harness.expect_ok(WORKER_THREAD_ENDPOINTS[0]).await.unwrap();

    // Closing here makes the harness's own close fail during teardown.
    harness.client_mut().close().unwrap();
    assert!(matches!(
        harness.get_text(WORKER_THREAD_ENDPOINTS[0]).await,
        Err(E2eError::ClientClosed)
    ));

    harness.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_path_is_404() {
    let harness = TestHarness::start(harness_config()).await.unwrap();

    match harness.get_text("/async-io/missing").await {
        Err(E2eError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected 404, got {:?}", other),
    }

    harness.shutdown().await.unwrap();
}

/// Resources only, writers left out of the deployment.
struct ResourceOnlyApp;

impl Application for ResourceOnlyApp {
    fn resources(&self) -> Vec<Box<dyn Resource>> {
        vec![Box::new(AsyncIoResource)]
    }

    fn providers(&self) -> Providers {
        Providers::new().blocking(BlockingWriter)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_writer_is_server_error() {
    let harness = TestHarness::start_with(harness_config(), &ResourceOnlyApp)
        .await
        .unwrap();

    harness.expect_ok(WORKER_THREAD_ENDPOINTS[0]).await.unwrap();
    match harness.get_text(WORKER_THREAD_ENDPOINTS[1]).await {
        Err(E2eError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected 500, got {:?}", other),
    }

    harness.shutdown().await.unwrap();
}

/// Writes half the body, then fails.
struct TruncatingWriter;

#[async_trait]
impl AsyncEntityWriter<AsyncWriterData> for TruncatingWriter {
    async fn write_to(&self, _entity: AsyncWriterData, sink: &mut AsyncSink) -> asyncio_common::Result<()> {
        sink.write(b"O").await?;
        Err(Error::Internal("writer gave up".to_string()))
    }
}

struct TruncatingApp;

impl Application for TruncatingApp {
    fn resources(&self) -> Vec<Box<dyn Resource>> {
        vec![Box::new(AsyncIoResource)]
    }

    fn providers(&self) -> Providers {
        Providers::new().non_blocking(TruncatingWriter)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_writer_aborts_the_body() {
    // One-chunk channel: the error must wait for capacity rather than be dropped.
    let config = ServerConfig {
        body_channel_capacity: 1,
        ..harness_config()
    };
    let harness = TestHarness::start_with(config, &TruncatingApp)
        .await
        .unwrap();

    assert!(matches!(
        harness.get_text(WORKER_THREAD_ENDPOINTS[1]).await,
        Err(E2eError::Http(_))
    ));

    harness.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn config_file_drives_the_harness() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asyncio.toml");
    std::fs::write(&path, "port = 0\nslow_write_delay_ms = 10\nbody_channel_capacity = 1\n").unwrap();

    let config = ServerConfig::load(&path).unwrap();
    let harness = TestHarness::start(config).await.unwrap();
    for path in WORKER_THREAD_ENDPOINTS {
        harness.expect_ok(path).await.unwrap();
    }

    harness.shutdown().await.unwrap();
}
