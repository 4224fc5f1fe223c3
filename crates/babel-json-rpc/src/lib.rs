//! # JSON-RPC 2.0 Core
//!
//! Transport-agnostic building blocks of the Babel Panel admin API:
//!
//! - the closed error taxonomy ([`RpcErrorCode`], [`RpcError`])
//! - request/response envelopes and the params normalization transform
//! - the per-request [`RequestContext`] handed to handlers
//! - the [`MethodRegistry`] mapping method names to handlers and access metadata
//!
//! Nothing in this crate knows about HTTP; the transport lives in `babel-http-server`.

pub mod context;
pub mod error;
pub mod handler;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use context::{AuthSession, AuthUser, ClientInfo, RequestContext};
pub use error::{HandlerError, JsonRpcError, RpcError, RpcErrorCode};
pub use handler::{FunctionHandler, RpcHandler, handler_fn, optional_param, param};
pub use registry::{
    DiscoveryInfo, MethodDescriptor, MethodMetadata, MethodRegistry, MethodStatistics,
    MetadataOverride, ServerInfo,
};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Numeric error codes, standard and application range
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const UNAUTHORIZED: i64 = -32001;
    pub const FORBIDDEN: i64 = -32002;
    pub const NOT_FOUND: i64 = -32003;
    pub const VALIDATION_ERROR: i64 = -32004;
    pub const RATE_LIMIT: i64 = -32005;
    pub const SERVICE_UNAVAILABLE: i64 = -32006;
    pub const TIMEOUT: i64 = -32007;
    pub const CONFLICT: i64 = -32008;
    pub const PRECONDITION_FAILED: i64 = -32009;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
