//! Core middleware trait definitions

use async_trait::async_trait;
use babel_json_rpc::RpcError;

use super::PipelineContext;

/// One stage of the dispatch pipeline.
///
/// Returning an error stops the pipeline; the error is sent to the caller
/// with the request id recorded in the context, if any.
#[async_trait]
pub trait RpcMiddleware: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn before_dispatch(&self, ctx: &mut PipelineContext) -> Result<(), RpcError>;
}
