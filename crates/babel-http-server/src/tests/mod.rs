//! Test modules for babel-http-server
//!
//! Routing and pipeline tests drive [`RpcHttpHandler`](crate::RpcHttpHandler)
//! with in-memory request bodies.
