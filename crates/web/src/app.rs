//! Application deployment units
//!
//! An [`Application`] bundles resources with the entity writers they need.
//! Deploying it against a [`ServerConfig`] yields a [`Deployment`]: a fully
//! built router for the application's context path.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use asyncio_common::{Error, ServerConfig};

use crate::resource::AsyncIoResource;
use crate::writer::{
    body_channel, AsyncEntityWriter, AsyncSink, AsyncWriter, BlockingEntityWriter, BlockingSink,
    BlockingWriter,
};

/// A set of routes mounted under a path
pub trait Resource: Send + Sync {
    /// Mount point, e.g. `/async-io`
    fn path(&self) -> &str;

    fn routes(&self) -> Router<DeploymentContext>;
}

/// A deployable bundle of resources and providers
pub trait Application: Send + Sync {
    /// Path all resources are mounted under
    fn context_path(&self) -> &str {
        "/"
    }

    fn resources(&self) -> Vec<Box<dyn Resource>>;

    fn providers(&self) -> Providers;
}

enum Registered<T: Send + 'static> {
    Blocking(Arc<dyn BlockingEntityWriter<T>>),
    Async(Arc<dyn AsyncEntityWriter<T>>),
}

impl<T: Send + 'static> Clone for Registered<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Blocking(w) => Self::Blocking(w.clone()),
            Self::Async(w) => Self::Async(w.clone()),
        }
    }
}

/// Entity writers keyed by entity type
#[derive(Clone, Default)]
pub struct Providers {
    writers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blocking writer for `T`, replacing any previous writer.
    pub fn blocking<T, W>(mut self, writer: W) -> Self
    where
        T: Send + 'static,
        W: BlockingEntityWriter<T>,
    {
        let entry: Registered<T> = Registered::Blocking(Arc::new(writer));
        self.writers.insert(TypeId::of::<T>(), Arc::new(entry));
        self
    }

    /// Register an async writer for `T`, replacing any previous writer.
    pub fn non_blocking<T, W>(mut self, writer: W) -> Self
    where
        T: Send + 'static,
        W: AsyncEntityWriter<T>,
    {
        let entry: Registered<T> = Registered::Async(Arc::new(writer));
        self.writers.insert(TypeId::of::<T>(), Arc::new(entry));
        self
    }

    pub fn supports<T: Send + 'static>(&self) -> bool {
        self.writers.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    fn lookup<T: Send + 'static>(&self) -> Option<Registered<T>> {
        let entry = self.writers.get(&TypeId::of::<T>())?.clone();
        entry
            .downcast::<Registered<T>>()
            .ok()
            .map(|registered| (*registered).clone())
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Per-deployment state shared by resource handlers
#[derive(Clone)]
pub struct DeploymentContext {
    providers: Arc<Providers>,
    body_channel_capacity: usize,
}

impl DeploymentContext {
    pub fn new(providers: Providers, config: &ServerConfig) -> Self {
        Self {
            providers: Arc::new(providers),
            body_channel_capacity: config.body_channel_capacity.max(1),
        }
    }

    /// Stream `entity` through its registered writer.
    ///
    /// Headers go out immediately; the writer fills the body from the
    /// blocking pool or a spawned task depending on its kind.
    pub fn render<T: Send + 'static>(&self, entity: T) -> Response {
        let Some(writer) = self.providers.lookup::<T>() else {
            return error_response(&Error::NoWriter(short_type_name::<T>()));
        };

        let (tx, body) = body_channel(self.body_channel_capacity);
        match writer {
            Registered::Blocking(writer) => {
                tokio::task::spawn_blocking(move || {
                    let mut sink = BlockingSink::new(tx);
                    if let Err(e) = writer.write_to(entity, &mut sink) {
                        report_write_failure::<T>(&e);
                        sink.abort(&e.to_string());
                    }
                });
            }
            Registered::Async(writer) => {
                tokio::spawn(async move {
                    let mut sink = AsyncSink::new(tx);
                    if let Err(e) = writer.write_to(entity, &mut sink).await {
                        report_write_failure::<T>(&e);
                        sink.abort(&e.to_string()).await;
                    }
                });
            }
        }

        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

fn report_write_failure<T>(e: &Error) {
    if e.is_disconnect() {
        debug!("client went away while writing {}", short_type_name::<T>());
    } else {
        warn!("writer for {} failed: {}", short_type_name::<T>(), e);
    }
}

/// Map a handler failure to a plain-text 500
pub fn error_response(e: &Error) -> Response {
    error!("request failed: {}", e);
    let body = match e {
        Error::NoWriter(name) => format!("no writer registered for {}", name),
        other => other.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// Normalize a context path: `/` becomes empty, trailing slashes are dropped
/// and a leading slash is ensured.
pub fn normalize_context_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// A built application ready to be served
pub struct Deployment {
    context_path: String,
    router: Router,
}

impl Deployment {
    pub fn build<A: Application + ?Sized>(app: &A, config: &ServerConfig) -> Self {
        let ctx = DeploymentContext::new(app.providers(), config);

        let mut routes: Router<DeploymentContext> = Router::new();
        for resource in app.resources() {
            let path = normalize_context_path(resource.path());
            routes = if path.is_empty() {
                routes.merge(resource.routes())
            } else {
                routes.nest(&path, resource.routes())
            };
        }
        let routes = routes.with_state(ctx);

        let context_path = normalize_context_path(app.context_path());
        let router = if context_path.is_empty() {
            routes
        } else {
            Router::new().nest(&context_path, routes)
        };

        Self {
            context_path,
            router,
        }
    }

    /// Normalized context path; empty for the root
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Whether a request path falls under this deployment
    pub fn matches(&self, path: &str) -> bool {
        self.context_path.is_empty()
            || path == self.context_path
            || path
                .strip_prefix(self.context_path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// The stock application: the `async-io` resource plus both writers
#[derive(Debug, Clone)]
pub struct AsyncIoApp {
    context_path: String,
    async_writer: AsyncWriter,
}

impl AsyncIoApp {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            context_path: "/".to_string(),
            async_writer: AsyncWriter::from_config(config),
        }
    }

    /// Mount under a different context path
    pub fn at(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }
}

impl Default for AsyncIoApp {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}

impl Application for AsyncIoApp {
    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn resources(&self) -> Vec<Box<dyn Resource>> {
        vec![Box::new(AsyncIoResource)]
    }

    fn providers(&self) -> Providers {
        Providers::new()
            .blocking(BlockingWriter)
            .non_blocking(self.async_writer)
    }
}
