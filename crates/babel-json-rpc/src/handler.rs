use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::context::RequestContext;
use crate::error::{HandlerError, RpcError};

/// A registered method implementation.
///
/// Receives the normalized positional params and the per-request context.
/// Taxonomy errors are returned as [`HandlerError::Rpc`]; anything else
/// becomes an `internalError` in the registry.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn invoke(
        &self,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, HandlerError>;
}

#[async_trait]
impl<H> RpcHandler for Arc<H>
where
    H: RpcHandler + ?Sized,
{
    async fn invoke(
        &self,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        (**self).invoke(params, context).await
    }
}

/// Handler backed by a closure
pub struct FunctionHandler<F>
where
    F: Fn(Vec<Value>, RequestContext) -> BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    handler_fn: F,
}

impl<F> FunctionHandler<F>
where
    F: Fn(Vec<Value>, RequestContext) -> BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F> RpcHandler for FunctionHandler<F>
where
    F: Fn(Vec<Value>, RequestContext) -> BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    async fn invoke(
        &self,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        (self.handler_fn)(params, context.clone()).await
    }
}

/// Wrap an async closure as a handler
pub fn handler_fn<F, Fut>(
    f: F,
) -> FunctionHandler<
    impl Fn(Vec<Value>, RequestContext) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync,
>
where
    F: Fn(Vec<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    FunctionHandler::new(move |params, ctx| -> BoxFuture<'static, Result<Value, HandlerError>> {
        Box::pin(f(params, ctx))
    })
}

/// Decode a required positional parameter.
///
/// Missing or mistyped values are reported as `invalidParams` naming the
/// parameter.
pub fn param<T>(params: &[Value], index: usize, name: &str) -> Result<T, RpcError>
where
    T: DeserializeOwned,
{
    match params.get(index) {
        None | Some(Value::Null) => Err(RpcError::invalid_params(Some(json!({
            "param": name,
            "reason": "missing required parameter",
        })))),
        Some(value) => decode(value, name),
    }
}

/// Decode an optional positional parameter; absent and `null` are `None`.
pub fn optional_param<T>(params: &[Value], index: usize, name: &str) -> Result<Option<T>, RpcError>
where
    T: DeserializeOwned,
{
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(value, name).map(Some),
    }
}

fn decode<T>(value: &Value, name: &str) -> Result<T, RpcError>
where
    T: DeserializeOwned,
{
    T::deserialize(value).map_err(|err| {
        RpcError::invalid_params(Some(json!({
            "param": name,
            "reason": err.to_string(),
        })))
    })
}
