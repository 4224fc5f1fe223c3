//! `user.*`: administrative user management

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use babel_json_rpc::{HandlerError, RequestContext, RpcError, RpcHandler, optional_param, param};
use babel_session_storage::{NewUser, UserFilter, UserRecord, UserUpdate};

use super::{ServiceContext, check_password_length, to_json};

pub struct UserService {
    ctx: Arc<ServiceContext>,
}

impl UserService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: UserFilter) -> Result<Value, HandlerError> {
        let page = self.ctx.users.list_users(&filter).await?;
        to_json(&page)
    }

    pub async fn get_by_id(&self, user_id: &str) -> Result<Value, HandlerError> {
        let user = self.find(user_id).await?;
        to_json(&user)
    }

    pub async fn create(&self, mut new_user: NewUser) -> Result<Value, HandlerError> {
        new_user.name = new_user.name.trim().to_string();
        new_user.email = new_user.email.trim().to_string();
        if new_user.name.is_empty() || new_user.email.is_empty() {
            return Err(RpcError::invalid_params(Some(json!({
                "message": "Name and email are required",
            })))
            .into());
        }
        check_email(&new_user.email)?;

        let password_hash = match new_user.password.take() {
            Some(password) => {
                check_password_length(&password)?;
                Some(self.ctx.hasher.hash(&password)?)
            }
            None => None,
        };

        let user = self
            .ctx
            .users
            .create_user(UserRecord::from_new(new_user, password_hash))
            .await?;
        info!("Created user {} ({})", user.email, user.id);
        Ok(json!({
            "success": true,
            "user": to_json(&user)?,
        }))
    }

    /// Banning a user also revokes their sessions
    pub async fn update(&self, user_id: &str, mut updates: UserUpdate) -> Result<Value, HandlerError> {
        if updates.is_empty() {
            return Err(RpcError::validation_error(json!({
                "message": "No updatable fields provided",
            }))
            .into());
        }
        if let Some(email) = updates.email.as_mut() {
            *email = email.trim().to_string();
            check_email(email)?;
        }
        let banning = updates.banned == Some(true);

        let user = self.ctx.users.update_user(user_id, updates).await?;
        if banning {
            let revoked = self.ctx.sessions.delete_user_sessions(user_id).await?;
            info!("Banned user {}, revoked {} sessions", user_id, revoked);
        }
        to_json(&user)
    }

    pub async fn delete(&self, user_id: &str, context: &RequestContext) -> Result<Value, HandlerError> {
        if context.user().is_some_and(|me| me.id == user_id) {
            return Err(RpcError::precondition_failed(Some(json!({
                "message": "Cannot delete the current user",
            })))
            .into());
        }

        self.ctx.users.delete_user(user_id).await?;
        info!("Deleted user {}", user_id);
        Ok(json!({ "success": true }))
    }

    pub async fn stats(&self) -> Result<Value, HandlerError> {
        let stats = self.ctx.users.user_stats().await?;
        to_json(&stats)
    }

    pub async fn reset_password(&self, user_id: &str, password: &str) -> Result<Value, HandlerError> {
        check_password_length(password)?;
        self.ctx
            .users
            .set_password_hash(user_id, self.ctx.hasher.hash(password)?)
            .await?;
        let revoked = self.ctx.sessions.delete_user_sessions(user_id).await?;
        info!("Reset password for user {}, revoked {} sessions", user_id, revoked);
        Ok(json!({
            "success": true,
            "revokedSessions": revoked,
        }))
    }

    async fn find(&self, user_id: &str) -> Result<UserRecord, HandlerError> {
        self.ctx
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| RpcError::not_found(Some("User")).into())
    }
}

fn check_email(email: &str) -> Result<(), RpcError> {
    if !email.contains('@') {
        return Err(RpcError::validation_error(json!({
            "field": "email",
            "message": "Invalid email address",
        })));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOp {
    List,
    GetById,
    Create,
    Update,
    Delete,
    GetStats,
    ResetPassword,
}

pub struct UserHandler {
    service: Arc<UserService>,
    op: UserOp,
}

impl UserHandler {
    pub fn new(service: Arc<UserService>, op: UserOp) -> Self {
        Self { service, op }
    }
}

#[async_trait]
impl RpcHandler for UserHandler {
    async fn invoke(
        &self,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        match self.op {
            UserOp::List => {
                let filter: Option<UserFilter> = optional_param(&params, 0, "filter")?;
                self.service.list(filter.unwrap_or_default()).await
            }
            UserOp::GetById => {
                let id: String = param(&params, 0, "id")?;
                self.service.get_by_id(&id).await
            }
            UserOp::Create => {
                let new_user: NewUser = param(&params, 0, "user")?;
                self.service.create(new_user).await
            }
            UserOp::Update => {
                let id: String = param(&params, 0, "id")?;
                let updates: UserUpdate = param(&params, 1, "updates")?;
                self.service.update(&id, updates).await
            }
            UserOp::Delete => {
                let id: String = param(&params, 0, "id")?;
                self.service.delete(&id, context).await
            }
            UserOp::GetStats => self.service.stats().await,
            UserOp::ResetPassword => {
                let id: String = param(&params, 0, "id")?;
                let password: String = param(&params, 1, "password")?;
                self.service.reset_password(&id, &password).await
            }
        }
    }
}
