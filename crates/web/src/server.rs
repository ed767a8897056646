//! Embedded server implementation

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use asyncio_common::{Error, PortProvider, Result, ServerConfig};

use crate::app::{normalize_context_path, Application, Deployment};

/// Deployed applications keyed by normalized context path
#[derive(Clone, Default)]
struct DeploymentTable {
    inner: Arc<RwLock<BTreeMap<String, Deployment>>>,
}

impl DeploymentTable {
    fn insert(&self, deployment: Deployment) -> bool {
        let key = deployment.context_path().to_string();
        self.inner.write().insert(key, deployment).is_some()
    }

    fn remove(&self, context_path: &str) -> bool {
        self.inner.write().remove(context_path).is_some()
    }

    fn context_paths(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Longest context path matching `path` wins
    fn resolve(&self, path: &str) -> Option<Router> {
        let table = self.inner.read();
        table
            .values()
            .filter(|d| d.matches(path))
            .max_by_key(|d| d.context_path().len())
            .map(Deployment::router)
    }
}

async fn dispatch(State(table): State<DeploymentTable>, req: Request) -> Response {
    let Some(router) = table.resolve(req.uri().path()) else {
        debug!("no deployment for {}", req.uri().path());
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    match router.oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// In-process HTTP server that applications are deployed into
pub struct EmbeddedServer {
    config: ServerConfig,
    deployments: DeploymentTable,
    running: Option<Running>,
}

impl EmbeddedServer {
    /// Create a new, stopped server
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            deployments: DeploymentTable::default(),
            running: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router that dispatches every request to the matching deployment
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(self.deployments.clone())
    }

    /// Bind the listener and start serving. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Err(Error::AlreadyStarted(running.addr.to_string()));
        }
        self.config.validate()?;

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr()?).await?;
        let addr = listener.local_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let router = self.router();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!("Embedded server listening on http://{}", addr);
        self.running = Some(Running {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Deploy an application; replaces any deployment at the same context path.
    pub fn deploy<A: Application + ?Sized>(&self, app: &A) -> String {
        let deployment = Deployment::build(app, &self.config);
        let context_path = deployment.context_path().to_string();
        if self.deployments.insert(deployment) {
            info!("Redeployed application at '{}/'", context_path);
        } else {
            info!("Deployed application at '{}/'", context_path);
        }
        context_path
    }

    pub fn undeploy(&self, context_path: &str) -> Result<()> {
        let key = normalize_context_path(context_path);
        if self.deployments.remove(&key) {
            info!("Undeployed application at '{}/'", key);
            Ok(())
        } else {
            Err(Error::NotDeployed(context_path.to_string()))
        }
    }

    /// Context paths currently deployed, root as empty string
    pub fn deployments(&self) -> Vec<String> {
        self.deployments.context_paths()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// URL builder for the bound address
    pub fn port_provider(&self) -> Result<PortProvider> {
        self.local_addr()
            .map(PortProvider::for_addr)
            .ok_or(Error::NotRunning)
    }

    pub fn base_url(&self) -> Result<String> {
        Ok(self.port_provider()?.generate_base_url())
    }

    /// Gracefully stop the server. A server that is not running is left alone.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        info!("Stopping embedded server on {}", running.addr);
        let _ = running.shutdown.send(());

        let timeout = self.config.shutdown_timeout();
        let mut task = running.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result.map_err(Error::from),
            Ok(Err(e)) => Err(Error::Internal(format!("server task failed: {}", e))),
            Err(_) => {
                warn!("Graceful shutdown timed out, aborting server task");
                task.abort();
                Err(Error::ShutdownTimeout {
                    seconds: self.config.shutdown_timeout_secs,
                })
            }
        }
    }
}

impl Drop for EmbeddedServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            debug!("Embedded server dropped while running, signalling shutdown");
            let _ = running.shutdown.send(());
        }
    }
}
