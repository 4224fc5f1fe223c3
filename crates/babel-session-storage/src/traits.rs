//! Storage traits consumed by the auth stage and the service handlers.
//!
//! Backends implement [`UserStorage`] and [`SessionStorage`]; the auth stage
//! only needs a [`SessionResolver`] to turn a bearer token into an
//! authenticated principal.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use babel_json_rpc::{AuthSession, AuthUser, HandlerError, RpcError};

use crate::records::{
    SessionMeta, SessionRecord, UserFilter, UserPage, UserRecord, UserStats, UserUpdate,
};

/// Storage failures, translated into taxonomy errors at the handler boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{field} already exists")]
    Conflict { field: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn user_not_found() -> Self {
        StorageError::NotFound("User".to_string())
    }

    pub fn conflict(field: impl Into<String>) -> Self {
        StorageError::Conflict {
            field: field.into(),
        }
    }
}

impl From<StorageError> for RpcError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(resource) => RpcError::not_found(Some(&resource)),
            StorageError::Conflict { field } => RpcError::conflict(Some(json!({
                "field": field,
                "message": format!("{} already exists", field),
            }))),
            StorageError::Validation(message) => {
                RpcError::validation_error(json!({ "message": message }))
            }
            StorageError::Unavailable(_) => RpcError::service_unavailable(Some("storage")),
            StorageError::Internal(message) => RpcError::internal_error(message),
        }
    }
}

impl From<StorageError> for HandlerError {
    fn from(error: StorageError) -> Self {
        HandlerError::Rpc(error.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Insert a new user; email and phone number must be unique
    async fn create_user(&self, user: UserRecord) -> StorageResult<UserRecord>;

    async fn get_user(&self, user_id: &str) -> StorageResult<Option<UserRecord>>;

    /// Exact, case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    async fn find_user_by_phone(&self, phone_number: &str) -> StorageResult<Option<UserRecord>>;

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> StorageResult<UserRecord>;

    async fn set_password_hash(&self, user_id: &str, password_hash: String) -> StorageResult<()>;

    async fn record_login(&self, user_id: &str) -> StorageResult<()>;

    /// Remove the user together with all of their sessions
    async fn delete_user(&self, user_id: &str) -> StorageResult<()>;

    /// Filtered page, ordered by creation time
    async fn list_users(&self, filter: &UserFilter) -> StorageResult<UserPage>;

    async fn user_stats(&self) -> StorageResult<UserStats>;
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn create_session(
        &self,
        user_id: &str,
        ttl: chrono::Duration,
        meta: SessionMeta,
    ) -> StorageResult<SessionRecord>;

    /// Live session for a token; expired sessions are reported as absent
    async fn get_session_by_token(&self, token: &str) -> StorageResult<Option<SessionRecord>>;

    /// Replace a live session's token and extend it by `ttl`
    async fn rotate_session(
        &self,
        token: &str,
        ttl: chrono::Duration,
    ) -> StorageResult<Option<SessionRecord>>;

    /// Returns whether a session was removed
    async fn delete_session(&self, session_id: &str) -> StorageResult<bool>;

    /// Returns the number of sessions removed
    async fn delete_user_sessions(&self, user_id: &str) -> StorageResult<usize>;

    /// Drop every expired session, returning how many were removed
    async fn expire_sessions(&self) -> StorageResult<usize>;
}

/// Turns a presented credential into the request's principal
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `None` when the token is unknown, expired, or belongs to a banned user
    async fn resolve(&self, token: &str) -> StorageResult<Option<(AuthUser, AuthSession)>>;
}
