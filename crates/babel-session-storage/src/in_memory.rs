//! In-Memory User and Session Storage
//!
//! All state lives behind `Arc<RwLock<..>>`, so clones share the same data.
//! Suitable for development, tests and single-instance deployments where
//! losing state on restart is acceptable.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use babel_json_rpc::{AuthSession, AuthUser};

use crate::records::{
    Pagination, SessionMeta, SessionRecord, UserFilter, UserPage, UserRecord, UserRole, UserStats,
    UserUpdate,
};
use crate::traits::{SessionResolver, SessionStorage, StorageError, StorageResult, UserStorage};

/// Configuration for in-memory storage
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Maximum live sessions kept at once
    pub max_sessions: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    /// Users by id
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    /// Sessions by token
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    config: InMemoryConfig,
}

/// Statistics for in-memory storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStats {
    pub user_count: usize,
    pub session_count: usize,
    pub max_sessions: usize,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default())
    }

    pub fn with_config(config: InMemoryConfig) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn stats(&self) -> InMemoryStats {
        InMemoryStats {
            user_count: self.users.read().await.len(),
            session_count: self.sessions.read().await.len(),
            max_sessions: self.config.max_sessions,
        }
    }
}

fn email_taken(users: &HashMap<String, UserRecord>, email: &str, except: Option<&str>) -> bool {
    users
        .values()
        .any(|u| Some(u.id.as_str()) != except && u.email.eq_ignore_ascii_case(email))
}

fn phone_taken(users: &HashMap<String, UserRecord>, phone: &str, except: Option<&str>) -> bool {
    users
        .values()
        .any(|u| Some(u.id.as_str()) != except && u.phone_number.as_deref() == Some(phone))
}

#[async_trait]
impl UserStorage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "InMemory"
    }

    async fn create_user(&self, user: UserRecord) -> StorageResult<UserRecord> {
        let mut users = self.users.write().await;

        if email_taken(&users, &user.email, None) {
            return Err(StorageError::conflict("email"));
        }
        if let Some(phone) = user.phone_number.as_deref()
            && phone_taken(&users, phone, None)
        {
            return Err(StorageError::conflict("phoneNumber"));
        }

        users.insert(user.id.clone(), user.clone());
        debug!("Created user {} ({})", user.email, user.id);
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> StorageResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_phone(&self, phone_number: &str) -> StorageResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> StorageResult<UserRecord> {
        let mut users = self.users.write().await;

        if !users.contains_key(user_id) {
            return Err(StorageError::user_not_found());
        }
        if let Some(email) = update.email.as_deref()
            && email_taken(&users, email, Some(user_id))
        {
            return Err(StorageError::conflict("email"));
        }
        if let Some(phone) = update.phone_number.as_deref()
            && phone_taken(&users, phone, Some(user_id))
        {
            return Err(StorageError::conflict("phoneNumber"));
        }

        let user = users
            .get_mut(user_id)
            .ok_or_else(StorageError::user_not_found)?;
        user.apply(update);
        Ok(user.clone())
    }

    async fn set_password_hash(&self, user_id: &str, password_hash: String) -> StorageResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(StorageError::user_not_found)?;
        user.password_hash = Some(password_hash);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login(&self, user_id: &str) -> StorageResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(StorageError::user_not_found)?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> StorageResult<()> {
        if self.users.write().await.remove(user_id).is_none() {
            return Err(StorageError::user_not_found());
        }
        let removed = self.delete_user_sessions(user_id).await?;
        info!("Deleted user {} and {} sessions", user_id, removed);
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> StorageResult<UserPage> {
        let users = self.users.read().await;

        let mut matching: Vec<&UserRecord> = users.values().filter(|u| u.matches(filter)).collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit() as usize)
            .cloned()
            .collect();

        Ok(UserPage {
            users: page,
            pagination: Pagination::new(filter.page(), filter.limit(), total),
        })
    }

    async fn user_stats(&self) -> StorageResult<UserStats> {
        let users = self.users.read().await;

        let mut by_role: BTreeMap<String, usize> = UserRole::ALL
            .into_iter()
            .map(|role| (role.as_str().to_string(), 0))
            .collect();
        for user in users.values() {
            *by_role.entry(user.role.as_str().to_string()).or_default() += 1;
        }

        let now = Utc::now();
        Ok(UserStats {
            total: users.len(),
            admins: users.values().filter(|u| u.role == UserRole::Admin).count(),
            banned: users.values().filter(|u| u.is_banned_at(now)).count(),
            verified: users.values().filter(|u| u.email_verified).count(),
            by_role,
        })
    }
}

#[async_trait]
impl SessionStorage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "InMemory"
    }

    async fn create_session(
        &self,
        user_id: &str,
        ttl: chrono::Duration,
        meta: SessionMeta,
    ) -> StorageResult<SessionRecord> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.config.max_sessions {
            let now = Utc::now();
            sessions.retain(|_, s| !s.is_expired_at(now));
            if sessions.len() >= self.config.max_sessions {
                warn!("Session limit of {} reached", self.config.max_sessions);
                return Err(StorageError::Unavailable(format!(
                    "maximum sessions limit reached: {}",
                    self.config.max_sessions
                )));
            }
        }

        let session = SessionRecord::new(user_id, ttl, meta);
        sessions.insert(session.token.clone(), session.clone());
        debug!("Created session {} for user {}", session.id, user_id);
        Ok(session)
    }

    async fn get_session_by_token(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|s| !s.is_expired_at(Utc::now()))
            .cloned())
    }

    async fn rotate_session(
        &self,
        token: &str,
        ttl: chrono::Duration,
    ) -> StorageResult<Option<SessionRecord>> {
        let mut sessions = self.sessions.write().await;

        let now = Utc::now();
        let Some(mut session) = sessions.remove(token) else {
            return Ok(None);
        };
        if session.is_expired_at(now) {
            return Ok(None);
        }

        session.token = crate::records::generate_token();
        session.expires_at = now + ttl;
        sessions.insert(session.token.clone(), session.clone());
        debug!("Rotated token for session {}", session.id);
        Ok(Some(session))
    }

    async fn delete_session(&self, session_id: &str) -> StorageResult<bool> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.id != session_id);
        Ok(sessions.len() < before)
    }

    async fn delete_user_sessions(&self, user_id: &str) -> StorageResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(before - sessions.len())
    }

    async fn expire_sessions(&self) -> StorageResult<usize> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Expired {} sessions", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl SessionResolver for InMemoryStorage {
    async fn resolve(&self, token: &str) -> StorageResult<Option<(AuthUser, AuthSession)>> {
        let Some(session) = self.get_session_by_token(token).await? else {
            return Ok(None);
        };
        let Some(user) = self.get_user(&session.user_id).await? else {
            debug!("Session {} refers to a missing user", session.id);
            return Ok(None);
        };
        if user.is_banned_at(Utc::now()) {
            debug!("Rejecting session {} of banned user {}", session.id, user.id);
            return Ok(None);
        }
        Ok(Some((user.auth_user(), session.auth_session())))
    }
}
