//! The dispatch stage and the pipeline that leads to it

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hyper::HeaderMap;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use babel_json_rpc::{JsonRpcMessage, MethodRegistry, RpcError};
use babel_session_storage::SessionResolver;

use crate::middleware::{
    AuthMiddleware, MiddlewareStack, ParamsMiddleware, PipelineContext, RpcMiddleware,
};

/// Runs the params and auth stages, then invokes the registry
pub struct RpcDispatcher {
    registry: Arc<MethodRegistry>,
    stack: MiddlewareStack,
    request_timeout: Duration,
}

impl RpcDispatcher {
    /// Standard pipeline: params, auth, then any extra stages in order
    pub fn new(
        registry: Arc<MethodRegistry>,
        resolver: Arc<dyn SessionResolver>,
        request_timeout: Duration,
    ) -> Self {
        let mut stack = MiddlewareStack::new();
        stack.push(Arc::new(ParamsMiddleware));
        stack.push(Arc::new(AuthMiddleware::new(Arc::clone(&registry), resolver)));
        Self {
            registry,
            stack,
            request_timeout,
        }
    }

    /// Append a stage after the built-in ones
    pub fn with_middleware(mut self, middleware: Arc<dyn RpcMiddleware>) -> Self {
        self.stack.push(middleware);
        self
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Process one call from raw body to response envelope
    pub async fn handle(&self, body: Bytes, headers: HeaderMap) -> JsonRpcMessage {
        let trace_id = Uuid::now_v7();
        let span = info_span!("rpc", %trace_id, method = tracing::field::Empty);
        let started = Instant::now();

        let message = self.run(body, headers).instrument(span.clone()).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        span.in_scope(|| match message.rpc_error() {
            Some(err) => info!(code = err.code, duration_ms, "RPC call failed: {}", err.message),
            None => info!(duration_ms, "RPC call completed"),
        });
        message
    }

    async fn run(&self, body: Bytes, headers: HeaderMap) -> JsonRpcMessage {
        let mut ctx = PipelineContext::new(body, headers);

        if let Err(err) = self.stack.execute_before(&mut ctx).await {
            if let Some(method) = ctx.method() {
                tracing::Span::current().record("method", method);
            }
            return JsonRpcMessage::error(ctx.id().cloned(), err);
        }

        let (Some(request), context) = ctx.into_parts() else {
            // The params stage always sets the request on success
            return JsonRpcMessage::error(None, RpcError::invalid_request(None));
        };
        tracing::Span::current().record("method", request.method.as_str());

        if !self.registry.has_method(&request.method) {
            return JsonRpcMessage::error(request.id, RpcError::method_not_found(&request.method));
        }

        debug!(params = request.params.len(), "Dispatching");
        let invocation = self
            .registry
            .invoke(&request.method, request.params, &context);

        match tokio::time::timeout(self.request_timeout, invocation).await {
            Ok(Ok(result)) => JsonRpcMessage::success(request.id, result),
            Ok(Err(err)) => JsonRpcMessage::error(request.id, err),
            Err(_) => {
                warn!(
                    "RPC call exceeded {}ms timeout",
                    self.request_timeout.as_millis()
                );
                JsonRpcMessage::error(request.id, RpcError::timeout(Some(&request.method)))
            }
        }
    }
}

impl std::fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDispatcher")
            .field("registry", &self.registry)
            .field("stack", &self.stack)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
