//! Persisted user and session records, and the shapes used to query them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use babel_json_rpc::{AuthSession, AuthUser};

/// Default page size for user listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Upper bound on page size
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Moderator,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::User, UserRole::Admin, UserRole::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// A stored user account.
///
/// The password hash never leaves the storage layer in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub display_username: String,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub phone_number_verified: bool,
    pub image: Option<String>,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

impl UserRecord {
    /// Build a fresh record from creation input; usernames are generated
    pub fn from_new(new: NewUser, password_hash: Option<String>) -> Self {
        let now = Utc::now();
        let username = short_id();
        Self {
            id: Uuid::now_v7().to_string(),
            name: new.name,
            email: new.email,
            display_username: new.display_username.unwrap_or_else(|| username.clone()),
            username,
            phone_number: new.phone_number,
            role: new.role.unwrap_or_default(),
            email_verified: new.email_verified.unwrap_or(false),
            phone_number_verified: new.phone_number_verified.unwrap_or(false),
            image: None,
            banned: false,
            ban_reason: None,
            ban_expires: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            password_hash,
        }
    }

    /// Banned with no expiry, or with an expiry still in the future
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned && self.ban_expires.is_none_or(|expires| expires > now)
    }

    pub fn auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: Some(self.name.clone()),
            role: self.role.as_str().to_string(),
        }
    }

    /// Apply a partial update; `None` fields are left untouched
    pub fn apply(&mut self, update: UserUpdate) {
        let UserUpdate {
            name,
            email,
            phone_number,
            display_username,
            image,
            role,
            email_verified,
            phone_number_verified,
            banned,
            ban_reason,
            ban_expires,
        } = update;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone_number) = phone_number {
            self.phone_number = Some(phone_number);
        }
        if let Some(display_username) = display_username {
            self.display_username = display_username;
        }
        if let Some(image) = image {
            self.image = Some(image);
        }
        if let Some(role) = role {
            self.role = role;
        }
        if let Some(verified) = email_verified {
            self.email_verified = verified;
        }
        if let Some(verified) = phone_number_verified {
            self.phone_number_verified = verified;
        }
        if let Some(banned) = banned {
            self.banned = banned;
            if !banned {
                self.ban_reason = None;
                self.ban_expires = None;
            }
        }
        if let Some(reason) = ban_reason {
            self.ban_reason = Some(reason);
        }
        if let Some(expires) = ban_expires {
            self.ban_expires = Some(expires);
        }
        self.updated_at = Utc::now();
    }

    pub fn matches(&self, filter: &UserFilter) -> bool {
        if filter.role.is_some_and(|role| role != self.role) {
            return false;
        }
        if filter
            .email_verified
            .is_some_and(|verified| verified != self.email_verified)
        {
            return false;
        }
        if filter.banned.is_some_and(|banned| banned != self.banned) {
            return false;
        }
        match filter.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => self
                .email
                .to_lowercase()
                .contains(&search.to_lowercase()),
            _ => true,
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

/// Input for `user.create`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
    pub phone_number_verified: Option<bool>,
    pub display_username: Option<String>,
}

/// Partial update; absent fields are kept
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_username: Option<String>,
    pub image: Option<String>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
    pub phone_number_verified: Option<bool>,
    pub banned: Option<bool>,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
}

impl UserUpdate {
    /// Restrict to the fields a user may change on their own profile
    pub fn self_service(self) -> Self {
        Self {
            name: self.name,
            phone_number: self.phone_number,
            display_username: self.display_username,
            image: self.image,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
    pub banned: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> usize {
        ((self.page() - 1) as usize) * self.limit() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1) as usize),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub banned: usize,
    pub verified: usize,
    pub by_role: BTreeMap<String, usize>,
}

/// A login session, addressed by its bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, ttl: chrono::Duration, meta: SessionMeta) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            token: generate_token(),
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + ttl,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn auth_session(&self) -> AuthSession {
        AuthSession {
            id: self.id.clone(),
            token: self.token.clone(),
            user_id: self.user_id.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// Client details recorded with a new session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Opaque bearer token: two random UUIDs, hex encoded
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn user(email: &str) -> UserRecord {
        UserRecord::from_new(
            NewUser {
                name: "Test".into(),
                email: email.into(),
                ..Default::default()
            },
            Some("digest".into()),
        )
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(user("a@babel.local")).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["emailVerified"], false);
    }

    #[test]
    fn test_generated_usernames() {
        let record = user("a@babel.local");
        assert_eq!(record.username.len(), 16);
        assert_eq!(record.display_username, record.username);
    }

    #[test]
    fn test_ban_expiry() {
        let now = Utc::now();
        let mut record = user("a@babel.local");
        assert!(!record.is_banned_at(now));

        record.banned = true;
        assert!(record.is_banned_at(now));

        record.ban_expires = Some(now - Duration::minutes(1));
        assert!(!record.is_banned_at(now));
    }

    #[test]
    fn test_apply_update_and_unban() {
        let mut record = user("a@babel.local");
        record.apply(UserUpdate {
            banned: Some(true),
            ban_reason: Some("spam".into()),
            role: Some(UserRole::Moderator),
            ..Default::default()
        });
        assert!(record.banned);
        assert_eq!(record.ban_reason.as_deref(), Some("spam"));
        assert_eq!(record.role, UserRole::Moderator);

        record.apply(UserUpdate {
            banned: Some(false),
            ..Default::default()
        });
        assert!(!record.banned);
        assert_eq!(record.ban_reason, None);
    }

    #[test]
    fn test_self_service_update_strips_privileged_fields() {
        let update: UserUpdate = serde_json::from_value(json!({
            "name": "New",
            "role": "admin",
            "banned": false,
            "emailVerified": true
        }))
        .unwrap();
        let update = update.self_service();
        assert_eq!(update.name.as_deref(), Some("New"));
        assert_eq!(update.role, None);
        assert_eq!(update.banned, None);
        assert_eq!(update.email_verified, None);
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn test_filter_search_is_case_insensitive_partial() {
        let record = user("Alice.Admin@Babel.local");
        let filter = |search: &str| UserFilter {
            search: Some(search.into()),
            ..Default::default()
        };
        assert!(record.matches(&filter("alice")));
        assert!(record.matches(&filter("BABEL")));
        assert!(!record.matches(&filter("bob")));
        assert!(record.matches(&filter("  ")));
    }

    #[test]
    fn test_filter_paging_defaults() {
        let filter = UserFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(filter.offset(), 0);

        let filter = UserFilter {
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_LIMIT);
        assert_eq!(filter.offset(), 200);
        assert_eq!(Pagination::new(1, 20, 41).total_pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_session_expiry() {
        let session = SessionRecord::new("u1", Duration::hours(1), SessionMeta::default());
        assert_eq!(session.token.len(), 64);
        assert!(!session.is_expired_at(Utc::now()));
        assert!(session.is_expired_at(session.expires_at));
        assert_eq!(session.auth_session().user_id, "u1");
    }
}
