//! Registry construction and startup tasks

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use babel_http_server::RpcHttpServer;
use babel_json_rpc::{MethodRegistry, ServerInfo};
use babel_session_storage::{
    InMemoryStorage, NewUser, PasswordHasher, SessionStorage, StorageResult, UserRecord, UserRole,
    UserStorage,
};

use crate::config::AppConfig;
use crate::methods;
use crate::services::{
    AuthHandler, AuthOp, AuthService, ServiceContext, SystemHandler, SystemOp, SystemService,
    UserHandler, UserOp, UserService,
};

/// Register every service method against the method catalog
pub fn build_registry(ctx: Arc<ServiceContext>) -> MethodRegistry {
    let mut registry = MethodRegistry::with_catalog(
        ServerInfo::new("Babel Panel API", env!("CARGO_PKG_VERSION")),
        methods::catalog(),
    );

    let system = Arc::new(SystemService::new(Arc::clone(&ctx)));
    for (name, op) in [
        (methods::SYSTEM_HEALTH, SystemOp::Health),
        (methods::SYSTEM_INFO, SystemOp::Info),
    ] {
        registry.register(name, SystemHandler::new(Arc::clone(&system), op));
    }

    let auth = Arc::new(AuthService::new(Arc::clone(&ctx)));
    for (name, op) in [
        (methods::AUTH_LOGIN, AuthOp::Login),
        (methods::AUTH_LOGOUT, AuthOp::Logout),
        (methods::AUTH_GET_SESSION, AuthOp::GetSession),
        (methods::AUTH_REFRESH_TOKEN, AuthOp::RefreshToken),
        (methods::AUTH_GET_ME, AuthOp::GetMe),
        (methods::AUTH_UPDATE_ME, AuthOp::UpdateMe),
        (methods::AUTH_CHANGE_PASSWORD, AuthOp::ChangePassword),
    ] {
        registry.register(name, AuthHandler::new(Arc::clone(&auth), op));
    }

    let users = Arc::new(UserService::new(ctx));
    for (name, op) in [
        (methods::USER_LIST, UserOp::List),
        (methods::USER_GET_BY_ID, UserOp::GetById),
        (methods::USER_CREATE, UserOp::Create),
        (methods::USER_UPDATE, UserOp::Update),
        (methods::USER_DELETE, UserOp::Delete),
        (methods::USER_GET_STATS, UserOp::GetStats),
        (methods::USER_RESET_PASSWORD, UserOp::ResetPassword),
    ] {
        registry.register(name, UserHandler::new(Arc::clone(&users), op));
    }

    info!("Registered {} RPC methods", registry.len());
    registry
}

/// Assemble the HTTP server over an in-memory backend
pub fn build_server(config: &AppConfig, storage: Arc<InMemoryStorage>) -> anyhow::Result<RpcHttpServer> {
    let ctx = Arc::new(ServiceContext::new(
        storage.clone(),
        storage.clone(),
        PasswordHasher::new(config.auth_secret.clone()),
        config.session_ttl(),
    ));
    let registry = Arc::new(build_registry(ctx));

    let server = RpcHttpServer::builder(registry, storage)
        .config(config.server_config()?)
        .build()?;
    Ok(server)
}

/// Create the admin account unless the email is already taken.
///
/// Returns whether an account was created.
pub async fn seed_admin(
    users: &dyn UserStorage,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
) -> StorageResult<bool> {
    if users.find_user_by_email(email).await?.is_some() {
        debug!("Admin account {} already exists", email);
        return Ok(false);
    }

    let record = UserRecord::from_new(
        NewUser {
            name: "Administrator".to_string(),
            email: email.to_string(),
            role: Some(UserRole::Admin),
            email_verified: Some(true),
            ..Default::default()
        },
        Some(hasher.hash(password)?),
    );
    let admin = users.create_user(record).await?;
    info!("Seeded admin account {} ({})", admin.email, admin.id);
    Ok(true)
}

/// Periodically drop expired sessions
pub fn start_session_cleanup(sessions: Arc<dyn SessionStorage>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.expire_sessions().await {
                Ok(0) => {}
                Ok(removed) => debug!("Cleaned up {} expired sessions", removed),
                Err(err) => warn!("Session cleanup failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{context, hasher};
    use babel_json_rpc::{RequestContext, RpcErrorCode};
    use babel_session_storage::SessionMeta;
    use serde_json::json;

    #[test]
    fn test_registry_covers_catalog() {
        let storage = Arc::new(InMemoryStorage::new());
        let registry = build_registry(context(&storage));

        let expected: Vec<String> = {
            let mut names: Vec<String> = methods::catalog()
                .into_iter()
                .map(|(name, _)| name.to_string())
                .collect();
            names.sort();
            names
        };
        assert_eq!(registry.all_methods(), expected);

        let stats = registry.discovery_info().statistics;
        assert_eq!(stats.total, 16);
        assert_eq!(stats.public, 4);
        assert_eq!(stats.admin, 7);

        assert!(!registry.requires_auth(methods::AUTH_LOGIN));
        assert!(registry.requires_auth(methods::AUTH_GET_ME));
        assert!(registry.requires_admin(methods::USER_DELETE));
    }

    #[tokio::test]
    async fn test_registry_enforces_access() {
        let storage = Arc::new(InMemoryStorage::new());
        seed_admin(storage.as_ref(), &hasher(), "root@babel.local", "password123")
            .await
            .unwrap();
        let registry = build_registry(context(&storage));

        let err = registry
            .invoke(methods::USER_LIST, vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::Unauthorized));

        let login = registry
            .invoke(
                methods::AUTH_LOGIN,
                vec![json!("root@babel.local"), json!("password123")],
                &RequestContext::anonymous(),
            )
            .await
            .unwrap();
        assert_eq!(login["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let storage = InMemoryStorage::new();
        let hasher = hasher();

        assert!(seed_admin(&storage, &hasher, "root@babel.local", "password123").await.unwrap());
        assert!(!seed_admin(&storage, &hasher, "ROOT@babel.local", "password123").await.unwrap());

        let admin = storage.find_user_by_email("root@babel.local").await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(admin.email_verified);
        assert!(hasher.verify("password123", admin.password_hash.as_deref().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cleanup_task() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .create_session("u1", chrono::Duration::seconds(-1), SessionMeta::default())
            .await
            .unwrap();
        storage
            .create_session("u2", chrono::Duration::hours(1), SessionMeta::default())
            .await
            .unwrap();

        let handle = start_session_cleanup(storage.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();

        assert_eq!(storage.stats().await.session_count, 1);
    }
}
