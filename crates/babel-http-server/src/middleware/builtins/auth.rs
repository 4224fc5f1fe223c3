use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use babel_json_rpc::{MethodRegistry, RequestContext, RpcError};
use babel_session_storage::SessionResolver;

use crate::middleware::{PipelineContext, RpcMiddleware};
use crate::protocol::{extract_client_info, extract_credentials};

/// Resolves the caller's session and enforces per-method access.
///
/// Credentials are resolved whenever present, so public methods still see
/// the caller. Only methods that require authentication reject anonymous
/// calls; unknown methods pass through to dispatch.
pub struct AuthMiddleware {
    registry: Arc<MethodRegistry>,
    resolver: Arc<dyn SessionResolver>,
}

impl AuthMiddleware {
    pub fn new(registry: Arc<MethodRegistry>, resolver: Arc<dyn SessionResolver>) -> Self {
        Self { registry, resolver }
    }
}

#[async_trait]
impl RpcMiddleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn before_dispatch(&self, ctx: &mut PipelineContext) -> Result<(), RpcError> {
        let Some(method) = ctx.method().map(str::to_string) else {
            return Ok(());
        };
        let client = extract_client_info(ctx.headers());

        let resolved = match extract_credentials(ctx.headers()) {
            Some(token) => self.resolver.resolve(&token).await.map_err(|err| {
                error!("Session lookup failed: {}", err);
                RpcError::from(err)
            })?,
            None => None,
        };

        let context = match resolved {
            Some((user, session)) => RequestContext::authenticated(user, session),
            None => RequestContext::anonymous(),
        }
        .with_client(client);

        if self.registry.requires_auth(&method) && !context.is_authenticated() {
            debug!(method = %method, "Rejecting anonymous call");
            return Err(RpcError::unauthorized());
        }
        if self.registry.requires_admin(&method) && !context.is_admin() {
            debug!(method = %method, "Rejecting non-admin call");
            return Err(RpcError::forbidden().with_message("Admin access required"));
        }

        ctx.set_request_context(context);
        Ok(())
    }
}
