//! The [`WebServer`] port and its axum implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::routing::get;
use axum::{Json, Router};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use spi::{Config, ServiceType};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::settings::{contexts_from, WebContext, DEFAULT_CONTEXT};
use crate::WebServerError;

/// Path of the liveness endpoint on the default context.
pub const HEALTH_PATH: &str = "/check/health";

/// Lets extensions contribute routes to a named context.
///
/// Routes are collected during initialization and served once the web server
/// extension starts.
pub trait WebServer: Send + Sync {
    /// Adds `router` to `context`. Routes are relative to the context path.
    fn register(&self, context: &str, router: Router) -> Result<(), WebServerError>;

    /// Returns `true` if `context` is configured.
    fn has_context(&self, context: &str) -> bool;

    /// The address `context` is listening on, once started.
    fn local_addr(&self, context: &str) -> Option<SocketAddr>;
}

impl ServiceType for dyn WebServer {
    const NAME: &'static str = "web-server";
}

/// One axum server per [`WebContext`], stopped together through a watch
/// channel.
pub struct AxumWebServer {
    contexts: Vec<WebContext>,
    routers: Mutex<IndexMap<String, Vec<Router>>>,
    bound: Mutex<HashMap<String, SocketAddr>>,
    servers: Mutex<Vec<(String, JoinHandle<()>)>>,
    stop: watch::Sender<bool>,
    started: AtomicBool,
}

impl std::fmt::Debug for AxumWebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxumWebServer")
            .field("contexts", &self.contexts)
            .field("bound", &*self.bound.lock())
            .finish_non_exhaustive()
    }
}

impl AxumWebServer {
    pub fn new(contexts: Vec<WebContext>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            contexts,
            routers: Mutex::new(IndexMap::new()),
            bound: Mutex::new(HashMap::new()),
            servers: Mutex::new(Vec::new()),
            stop,
            started: AtomicBool::new(false),
        }
    }

    /// Builds the server from the `web.http` settings.
    pub fn from_config(config: &Config) -> Result<Self, WebServerError> {
        Ok(Self::new(contexts_from(config)?))
    }

    pub fn contexts(&self) -> &[WebContext] {
        &self.contexts
    }

    /// Binds every context and spawns its server. Calling this twice is a
    /// no-op. If any context fails to bind, the ones already running are
    /// stopped.
    pub async fn start(&self) -> Result<(), WebServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut routers = std::mem::take(&mut *self.routers.lock());
        for context in &self.contexts {
            let contributed = routers.shift_remove(&context.name).unwrap_or_default();
            if let Err(err) = self.serve(context, build_router(context, contributed)).await {
                self.stop().await;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn serve(&self, context: &WebContext, app: Router) -> Result<(), WebServerError> {
        let addr = format!("{}:{}", context.host, context.port);
        let bind_error = |source| WebServerError::Bind {
            context: context.name.clone(),
            addr: addr.clone(),
            source,
        };
        let listener = TcpListener::bind(&addr).await.map_err(bind_error)?;
        let local = listener.local_addr().map_err(bind_error)?;
        self.bound.lock().insert(context.name.clone(), local);

        let mut stop = self.stop.subscribe();
        let name = context.name.clone();
        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            };
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(context = %name, error = %err, "Web context stopped with an error");
            }
        });
        self.servers.lock().push((context.name.clone(), handle));

        info!(
            context = %context.name,
            addr = %local,
            path = %context.path,
            "Web context listening"
        );
        Ok(())
    }

    /// Signals every server to stop and waits for in-flight requests.
    pub async fn stop(&self) {
        self.stop.send_replace(true);
        let servers = std::mem::take(&mut *self.servers.lock());
        for (name, handle) in servers {
            match handle.await {
                Ok(()) => debug!(context = %name, "Web context stopped"),
                Err(err) => warn!(context = %name, error = %err, "Web context task failed"),
            }
        }
    }
}

impl WebServer for AxumWebServer {
    fn register(&self, context: &str, router: Router) -> Result<(), WebServerError> {
        if !self.has_context(context) {
            return Err(WebServerError::UnknownContext {
                context: context.to_owned(),
            });
        }
        if self.started.load(Ordering::SeqCst) {
            return Err(WebServerError::AlreadyStarted {
                context: context.to_owned(),
            });
        }
        self.routers
            .lock()
            .entry(context.to_owned())
            .or_default()
            .push(router);
        debug!(context, "Routes registered");
        Ok(())
    }

    fn has_context(&self, context: &str) -> bool {
        self.contexts.iter().any(|c| c.name == context)
    }

    fn local_addr(&self, context: &str) -> Option<SocketAddr> {
        self.bound.lock().get(context).copied()
    }
}

/// Merges the contributed routers and nests them under the context path.
fn build_router(context: &WebContext, contributed: Vec<Router>) -> Router {
    let mut routes = contributed.into_iter().fold(Router::new(), Router::merge);
    if context.name == DEFAULT_CONTEXT {
        routes = routes.route(HEALTH_PATH, get(health));
    }
    if context.path == "/" {
        routes
    } else {
        Router::new().nest(&context.path, routes)
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "isSystemHealthy": true }))
}
