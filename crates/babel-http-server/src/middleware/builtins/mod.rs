//! Built-in pipeline stages
//!
//! - **Params**: envelope validation and params normalization
//! - **Auth**: session resolution and per-method access enforcement

mod auth;
mod params;

pub use auth::AuthMiddleware;
pub use params::ParamsMiddleware;
