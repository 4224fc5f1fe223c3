//! HTTP request routing for the JSON-RPC endpoint and its companions

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, warn};

use babel_json_rpc::{JsonRpcMessage, RpcError};

use crate::cors::CorsLayer;
use crate::dispatch::RpcDispatcher;
use crate::server::ServerConfig;
use crate::status::http_status;

/// Routes requests and renders every response as JSON
#[derive(Clone)]
pub struct RpcHttpHandler {
    config: Arc<ServerConfig>,
    dispatcher: Arc<RpcDispatcher>,
    cors: Option<CorsLayer>,
    started_at: Instant,
}

impl RpcHttpHandler {
    pub fn new(
        config: Arc<ServerConfig>,
        dispatcher: Arc<RpcDispatcher>,
        cors: Option<CorsLayer>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            cors,
            started_at: Instant::now(),
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!("Handling {} {}", method, path);

        let rpc_path = self.config.rpc_path.as_str();
        let mut response = match (&method, path.as_str()) {
            (&Method::OPTIONS, _) => self.preflight(),
            (&Method::POST, p) if p == rpc_path => self.handle_json_rpc(req).await,
            (&Method::GET, p) if p == rpc_path => self.discovery(),
            (&Method::GET, "/health") => self.health(),
            (&Method::GET, "/") => self.index(),
            _ => self.not_found(&method, &path),
        };

        if let Some(cors) = &self.cors {
            cors.apply_cors_headers(response.headers_mut());
        }
        response
    }

    async fn handle_json_rpc<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("");

        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        if !media_type.eq_ignore_ascii_case("application/json") {
            warn!("Invalid content type: {}", content_type);
            return rpc_error_response(
                StatusCode::BAD_REQUEST,
                RpcError::invalid_request(Some(json!("Content-Type must be application/json"))),
            );
        }

        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => {
                warn!(
                    "Request body exceeds {} bytes",
                    self.config.max_body_size
                );
                return rpc_error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    RpcError::invalid_request(Some(json!("Request body too large"))),
                );
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return rpc_error_response(
                    StatusCode::BAD_REQUEST,
                    RpcError::invalid_request(Some(json!("Failed to read request body"))),
                );
            }
        };

        let message = self.dispatcher.handle(body, parts.headers).await;
        let status = message.rpc_error().map_or(StatusCode::OK, http_status);
        json_response(status, &message)
    }

    fn preflight(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    }

    fn discovery(&self) -> Response<Full<Bytes>> {
        json_response(StatusCode::OK, &self.dispatcher.registry().discovery_info())
    }

    fn health(&self) -> Response<Full<Bytes>> {
        json_response(
            StatusCode::OK,
            &json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "uptime": self.started_at.elapsed().as_secs_f64(),
                "environment": self.config.environment,
                "rpc": {
                    "methods": self.dispatcher.registry().len(),
                },
            }),
        )
    }

    fn index(&self) -> Response<Full<Bytes>> {
        let stats = self.dispatcher.registry().discovery_info().statistics;
        let rpc_path = &self.config.rpc_path;
        json_response(
            StatusCode::OK,
            &json!({
                "name": self.config.api.name,
                "version": self.config.api.version,
                "description": self.config.api.description,
                "environment": self.config.environment,
                "endpoints": {
                    "rpc": format!("POST {}", rpc_path),
                    "discovery": format!("GET {}", rpc_path),
                    "health": "GET /health",
                },
                "methods": stats,
            }),
        )
    }

    fn not_found(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        let rpc_path = &self.config.rpc_path;
        json_response(
            StatusCode::NOT_FOUND,
            &json!({
                "error": "Not Found",
                "message": format!("Route {} {} not found", method, path),
                "available_endpoints": [
                    format!("POST {}", rpc_path),
                    format!("GET {}", rpc_path),
                    "GET /health",
                    "GET /",
                ],
            }),
        )
    }
}

fn rpc_error_response(status: StatusCode, error: RpcError) -> Response<Full<Bytes>> {
    json_response(status, &JsonRpcMessage::error(None, error))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(err) => {
            error!("Failed to serialize response: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(
                    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#,
                ),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
