use async_trait::async_trait;
use tracing::debug;

use babel_json_rpc::{JsonRpcError, JsonRpcRequest, RpcError};

use crate::middleware::{PipelineContext, RpcMiddleware};

/// Turns the raw body into a validated request with positional params
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamsMiddleware;

#[async_trait]
impl RpcMiddleware for ParamsMiddleware {
    fn name(&self) -> &'static str {
        "params"
    }

    async fn before_dispatch(&self, ctx: &mut PipelineContext) -> Result<(), RpcError> {
        match JsonRpcRequest::parse(ctx.body()) {
            Ok(request) => {
                debug!(
                    method = %request.method,
                    params = request.params.len(),
                    "Request envelope accepted"
                );
                ctx.set_request(request);
                Ok(())
            }
            Err(JsonRpcError { id, error, .. }) => {
                ctx.set_id(id);
                Err(error)
            }
        }
    }
}
