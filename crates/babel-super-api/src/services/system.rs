//! `system.*`: liveness and build information

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use babel_json_rpc::{HandlerError, RequestContext, RpcHandler};

use super::ServiceContext;

pub struct SystemService {
    ctx: Arc<ServiceContext>,
}

impl SystemService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub fn health(&self) -> Value {
        json!({
            "status": "ok",
            "timestamp": Utc::now(),
            "uptime": self.ctx.uptime(),
        })
    }

    pub fn info(&self) -> Value {
        json!({
            "name": "Babel Panel API",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "ok",
            "startedAt": self.ctx.started_at,
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOp {
    Health,
    Info,
}

pub struct SystemHandler {
    service: Arc<SystemService>,
    op: SystemOp,
}

impl SystemHandler {
    pub fn new(service: Arc<SystemService>, op: SystemOp) -> Self {
        Self { service, op }
    }
}

#[async_trait]
impl RpcHandler for SystemHandler {
    async fn invoke(
        &self,
        _params: Vec<Value>,
        _context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        Ok(match self.op {
            SystemOp::Health => self.service.health(),
            SystemOp::Info => self.service.info(),
        })
    }
}
