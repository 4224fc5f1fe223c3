//! Service handlers registered at bootstrap.
//!
//! Each service groups the operations of one namespace. Registration binds
//! a service and an operation into a handler value, so one service instance
//! backs every method of its namespace.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use babel_json_rpc::{HandlerError, RpcError};
use babel_session_storage::password::MIN_PASSWORD_LENGTH;
use babel_session_storage::{PasswordHasher, SessionStorage, UserStorage};

pub mod auth;
pub mod system;
pub mod user;

pub use auth::{AuthHandler, AuthOp, AuthService};
pub use system::{SystemHandler, SystemOp, SystemService};
pub use user::{UserHandler, UserOp, UserService};

/// Collaborators shared by every service
pub struct ServiceContext {
    pub users: Arc<dyn UserStorage>,
    pub sessions: Arc<dyn SessionStorage>,
    pub hasher: PasswordHasher,
    pub session_ttl: chrono::Duration,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl ServiceContext {
    pub fn new(
        users: Arc<dyn UserStorage>,
        sessions: Arc<dyn SessionStorage>,
        hasher: PasswordHasher,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            session_ttl,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Seconds since the context was created
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("users", &self.users.backend_name())
            .field("sessions", &self.sessions.backend_name())
            .field("session_ttl", &self.session_ttl)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(HandlerError::unexpected)
}

pub(crate) fn check_password_length(password: &str) -> Result<(), RpcError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RpcError::validation_error(json!({
            "field": "password",
            "message": format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        })));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use babel_json_rpc::{AuthSession, AuthUser, RequestContext};
    use babel_session_storage::{
        InMemoryStorage, NewUser, PasswordHasher, PasswordParams, SessionMeta, SessionStorage,
        UserRecord, UserRole, UserStorage,
    };

    use super::ServiceContext;

    pub const SECRET: &str = "test-secret-test-secret-test-secret";

    /// Minimum-cost hasher so tests stay fast
    pub fn hasher() -> PasswordHasher {
        PasswordHasher::with_params(SECRET, PasswordParams::new(64, 1, 1, None).unwrap())
    }

    pub fn context(storage: &Arc<InMemoryStorage>) -> Arc<ServiceContext> {
        Arc::new(ServiceContext::new(
            storage.clone(),
            storage.clone(),
            hasher(),
            chrono::Duration::hours(1),
        ))
    }

    pub async fn user(
        storage: &InMemoryStorage,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> UserRecord {
        let hash = hasher().hash(password).unwrap();
        storage
            .create_user(UserRecord::from_new(
                NewUser {
                    name: email.split('@').next().unwrap_or_default().to_string(),
                    email: email.to_string(),
                    role: Some(role),
                    ..Default::default()
                },
                Some(hash),
            ))
            .await
            .unwrap()
    }

    /// Context authenticated as `user` with a real stored session
    pub async fn signed_in(storage: &InMemoryStorage, user: &UserRecord) -> RequestContext {
        let session = storage
            .create_session(&user.id, chrono::Duration::hours(1), SessionMeta::default())
            .await
            .unwrap();
        let auth_user: AuthUser = user.auth_user();
        let auth_session: AuthSession = session.auth_session();
        RequestContext::authenticated(auth_user, auth_session)
    }
}
