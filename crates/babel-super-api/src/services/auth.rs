//! `auth.*`: login, sessions and self-service profile management

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use babel_json_rpc::{HandlerError, RequestContext, RpcError, RpcHandler, param};
use babel_session_storage::{SessionMeta, UserRecord, UserUpdate};

use super::{ServiceContext, check_password_length, to_json};

pub struct AuthService {
    ctx: Arc<ServiceContext>,
}

impl AuthService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Accounts containing `@` are emails, anything else a phone number
    pub async fn login(
        &self,
        account: &str,
        password: &str,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        let account = account.trim();
        if account.is_empty() || password.is_empty() {
            return Err(RpcError::invalid_params(Some(json!({
                "message": "Account and password are required",
            })))
            .into());
        }

        let user = if account.contains('@') {
            self.ctx.users.find_user_by_email(account).await?
        } else {
            self.ctx.users.find_user_by_phone(account).await?
        };

        let Some(user) = user.filter(|u| {
            u.password_hash
                .as_deref()
                .is_some_and(|hash| self.ctx.hasher.verify(password, hash))
        }) else {
            warn!("Failed login for {}", account);
            return Err(RpcError::unauthorized()
                .with_message("Invalid credentials")
                .into());
        };

        if user.is_banned_at(Utc::now()) {
            warn!("Banned user {} attempted to log in", user.id);
            return Err(banned(&user).into());
        }

        let client = context.client();
        let session = self
            .ctx
            .sessions
            .create_session(
                &user.id,
                self.ctx.session_ttl,
                SessionMeta {
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                },
            )
            .await?;
        self.ctx.users.record_login(&user.id).await?;

        info!("User {} logged in", user.id);
        Ok(json!({
            "token": session.token,
            "expiresAt": session.expires_at,
            "user": to_json(&user)?,
        }))
    }

    pub async fn logout(&self, context: &RequestContext) -> Result<Value, HandlerError> {
        let session = context.require_session()?;
        let removed = self.ctx.sessions.delete_session(&session.id).await?;
        if !removed {
            debug!("Session {} was already gone at logout", session.id);
        }
        info!("User {} logged out", session.user_id);
        Ok(json!({
            "success": true,
            "message": "Logged out successfully",
        }))
    }

    pub async fn get_session(&self, context: &RequestContext) -> Result<Value, HandlerError> {
        let user = context.require_user()?;
        let session = context.require_session()?;
        Ok(json!({
            "user": to_json(user)?,
            "session": {
                "id": session.id,
                "userId": session.user_id,
                "expiresAt": session.expires_at,
            },
        }))
    }

    pub async fn refresh_token(&self, token: &str) -> Result<Value, HandlerError> {
        if token.trim().is_empty() {
            return Err(RpcError::invalid_params(Some(json!({
                "message": "Refresh token is required",
            })))
            .into());
        }

        let Some(session) = self
            .ctx
            .sessions
            .rotate_session(token, self.ctx.session_ttl)
            .await?
        else {
            return Err(RpcError::unauthorized()
                .with_message("Invalid refresh token")
                .into());
        };

        Ok(json!({
            "token": session.token,
            "expiresAt": session.expires_at,
        }))
    }

    pub async fn get_me(&self, context: &RequestContext) -> Result<Value, HandlerError> {
        let user = self.current_user(context).await?;
        to_json(&user)
    }

    pub async fn update_me(
        &self,
        updates: UserUpdate,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        let user = context.require_user()?;
        let updates = updates.self_service();
        if updates.is_empty() {
            return Err(RpcError::validation_error(json!({
                "message": "No updatable fields provided",
            }))
            .into());
        }

        let updated = self.ctx.users.update_user(&user.id, updates).await?;
        to_json(&updated)
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        check_password_length(new)?;
        let user = self.current_user(context).await?;

        let matches = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.ctx.hasher.verify(current, hash));
        if !matches {
            return Err(RpcError::validation_error(json!({
                "field": "currentPassword",
                "message": "Current password is incorrect",
            }))
            .into());
        }

        self.ctx
            .users
            .set_password_hash(&user.id, self.ctx.hasher.hash(new)?)
            .await?;
        info!("User {} changed password", user.id);
        Ok(json!({ "success": true }))
    }

    async fn current_user(&self, context: &RequestContext) -> Result<UserRecord, HandlerError> {
        let user = context.require_user()?;
        self.ctx
            .users
            .get_user(&user.id)
            .await?
            .ok_or_else(|| RpcError::not_found(Some("User")).into())
    }
}

fn banned(user: &UserRecord) -> RpcError {
    RpcError::forbidden()
        .with_message("User is banned")
        .with_data(json!({
            "reason": user.ban_reason,
            "expiresAt": user.ban_expires,
        }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOp {
    Login,
    Logout,
    GetSession,
    RefreshToken,
    GetMe,
    UpdateMe,
    ChangePassword,
}

/// Binds one [`AuthOp`] of a shared [`AuthService`] as a method handler
pub struct AuthHandler {
    service: Arc<AuthService>,
    op: AuthOp,
}

impl AuthHandler {
    pub fn new(service: Arc<AuthService>, op: AuthOp) -> Self {
        Self { service, op }
    }
}

#[async_trait]
impl RpcHandler for AuthHandler {
    async fn invoke(
        &self,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, HandlerError> {
        match self.op {
            AuthOp::Login => {
                let account: String = param(&params, 0, "account")?;
                let password: String = param(&params, 1, "password")?;
                self.service.login(&account, &password, context).await
            }
            AuthOp::Logout => self.service.logout(context).await,
            AuthOp::GetSession => self.service.get_session(context).await,
            AuthOp::RefreshToken => {
                let token: String = param(&params, 0, "token")?;
                self.service.refresh_token(&token).await
            }
            AuthOp::GetMe => self.service.get_me(context).await,
            AuthOp::UpdateMe => {
                let updates: UserUpdate = param(&params, 0, "updates")?;
                self.service.update_me(updates, context).await
            }
            AuthOp::ChangePassword => {
                let current: String = param(&params, 0, "currentPassword")?;
                let new: String = param(&params, 1, "newPassword")?;
                self.service.change_password(&current, &new, context).await
            }
        }
    }
}
