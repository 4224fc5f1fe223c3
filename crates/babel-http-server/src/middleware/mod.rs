//! Dispatch pipeline stages
//!
//! Every call runs the same ordered stages over a shared
//! [`PipelineContext`]. A stage either enriches the context or
//! short-circuits the call with a taxonomy error:
//!
//! - [`ParamsMiddleware`](builtins::ParamsMiddleware): body to validated envelope
//! - [`AuthMiddleware`](builtins::AuthMiddleware): session resolution and access checks
//!
//! The final dispatch stage is owned by [`RpcDispatcher`](crate::RpcDispatcher).
//!
//! # Examples
//!
//! ```rust,no_run
//! use babel_http_server::middleware::{PipelineContext, RpcMiddleware};
//! use babel_json_rpc::RpcError;
//! use async_trait::async_trait;
//!
//! struct LoggingMiddleware;
//!
//! #[async_trait]
//! impl RpcMiddleware for LoggingMiddleware {
//!     async fn before_dispatch(&self, ctx: &mut PipelineContext) -> Result<(), RpcError> {
//!         println!("Request: {:?}", ctx.method());
//!         Ok(())
//!     }
//! }
//! ```

pub mod builtins;
pub mod context;
pub mod stack;
pub mod traits;

pub use builtins::{AuthMiddleware, ParamsMiddleware};
pub use context::PipelineContext;
pub use stack::MiddlewareStack;
pub use traits::RpcMiddleware;
