//! Common imports for handler and service code
//!
//! ```rust
//! use babel_json_rpc::prelude::*;
//! ```

pub use crate::{
    AuthSession, AuthUser, HandlerError, JsonRpcError, JsonRpcMessage, JsonRpcRequest,
    JsonRpcResponse, MetadataOverride, MethodMetadata, MethodRegistry, RequestContext, RequestId,
    RpcError, RpcErrorCode, RpcHandler, handler_fn, optional_param, param,
};

pub use async_trait::async_trait;
pub use serde_json::{Value, json};
