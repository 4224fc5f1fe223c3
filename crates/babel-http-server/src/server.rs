//! HTTP server for the JSON-RPC admin API
//!
//! Accept loop over a tokio `TcpListener`; each connection is served by
//! hyper's HTTP/1 implementation on its own task.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use babel_json_rpc::MethodRegistry;
use babel_session_storage::SessionResolver;

use crate::middleware::RpcMiddleware;
use crate::{CorsLayer, Result, RpcDispatcher, RpcHttpHandler};

/// Cross-origin settings: a single allowed origin with credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub origin: String,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3001".to_string(),
            max_age_secs: 600,
        }
    }
}

/// Identity reported by `GET /`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            name: "Babel Panel API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Super-admin JSON-RPC API".to_string(),
        }
    }
}

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the JSON-RPC endpoint
    pub rpc_path: String,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Upper bound on a single dispatch
    pub request_timeout: Duration,
    /// CORS headers; `None` disables them
    pub cors: Option<CorsConfig>,
    /// Deployment environment reported by health and index
    pub environment: String,
    pub api: ApiInfo,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rpc_path: "/json-rpc".to_string(),
            max_body_size: 1024 * 1024, // 1MB
            request_timeout: Duration::from_secs(30),
            cors: Some(CorsConfig::default()),
            environment: "development".to_string(),
            api: ApiInfo::default(),
        }
    }
}

/// Builder for the HTTP server
pub struct RpcHttpServerBuilder {
    config: ServerConfig,
    registry: Arc<MethodRegistry>,
    resolver: Arc<dyn SessionResolver>,
    middleware: Vec<Arc<dyn RpcMiddleware>>,
}

impl RpcHttpServerBuilder {
    pub fn new(registry: Arc<MethodRegistry>, resolver: Arc<dyn SessionResolver>) -> Self {
        Self {
            config: ServerConfig::default(),
            registry,
            resolver,
            middleware: Vec::new(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn cors(mut self, cors: Option<CorsConfig>) -> Self {
        self.config.cors = cors;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Add a stage after the built-in params and auth stages
    pub fn middleware(mut self, middleware: Arc<dyn RpcMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Build the server; fails on an unusable CORS origin
    pub fn build(self) -> Result<RpcHttpServer> {
        let cors = self
            .config
            .cors
            .as_ref()
            .map(|c| CorsLayer::new(&c.origin, c.max_age_secs))
            .transpose()?;

        let dispatcher = self.middleware.into_iter().fold(
            RpcDispatcher::new(self.registry, self.resolver, self.config.request_timeout),
            RpcDispatcher::with_middleware,
        );

        let config = Arc::new(self.config);
        let handler = RpcHttpHandler::new(Arc::clone(&config), Arc::new(dispatcher), cors);

        Ok(RpcHttpServer { config, handler })
    }
}

#[derive(Clone)]
pub struct RpcHttpServer {
    config: Arc<ServerConfig>,
    handler: RpcHttpHandler,
}

impl RpcHttpServer {
    pub fn builder(
        registry: Arc<MethodRegistry>,
        resolver: Arc<dyn SessionResolver>,
    ) -> RpcHttpServerBuilder {
        RpcHttpServerBuilder::new(registry, resolver)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handler(&self) -> &RpcHttpHandler {
        &self.handler
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("JSON-RPC server listening on {}", local_addr);
        info!("RPC endpoint available at: {}", self.config.rpc_path);

        tokio::pin!(shutdown);
        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                () = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected: {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
