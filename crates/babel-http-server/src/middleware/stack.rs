//! Middleware stack execution

use std::sync::Arc;

use babel_json_rpc::RpcError;
use tracing::debug;

use super::{PipelineContext, RpcMiddleware};

#[derive(Default, Clone)]
pub struct MiddlewareStack {
    middleware: Vec<Arc<dyn RpcMiddleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn RpcMiddleware>) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run every stage in order, stopping at the first error
    pub async fn execute_before(&self, ctx: &mut PipelineContext) -> Result<(), RpcError> {
        for middleware in &self.middleware {
            if let Err(err) = middleware.before_dispatch(ctx).await {
                debug!(
                    stage = middleware.name(),
                    code = err.code,
                    "Pipeline stopped: {}",
                    err.message
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.middleware.iter().map(|m| m.name()))
            .finish()
    }
}
