//! Per-request authentication context handed to handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Role granting access to admin-only methods
pub const ADMIN_ROLE: &str = "admin";

/// The authenticated principal of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// The session a request was authenticated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Transport details about the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Created fresh for each request; user and session are either both
/// present or both absent.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    auth: Option<(AuthUser, AuthSession)>,
    client: ClientInfo,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: AuthUser, session: AuthSession) -> Self {
        Self {
            auth: Some((user, session)),
            client: ClientInfo::default(),
        }
    }

    pub fn with_client(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.auth.as_ref().map(|(user, _)| user)
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.auth.as_ref().map(|(_, session)| session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(AuthUser::is_admin)
    }

    /// The authenticated user, or `unauthorized`
    pub fn require_user(&self) -> Result<&AuthUser, RpcError> {
        self.user().ok_or_else(RpcError::unauthorized)
    }

    /// The authenticated session, or `unauthorized`
    pub fn require_session(&self) -> Result<&AuthSession, RpcError> {
        self.session().ok_or_else(RpcError::unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcErrorCode;
    use chrono::Duration;

    fn admin() -> (AuthUser, AuthSession) {
        (
            AuthUser {
                id: "u1".into(),
                email: "root@babel.local".into(),
                name: None,
                role: ADMIN_ROLE.into(),
            },
            AuthSession {
                id: "s1".into(),
                token: "t".into(),
                user_id: "u1".into(),
                expires_at: Utc::now() + Duration::hours(1),
            },
        )
    }

    #[test]
    fn test_anonymous_context() {
        let ctx = RequestContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert!(!ctx.is_admin());
        assert!(ctx.require_user().unwrap_err().is(RpcErrorCode::Unauthorized));
        assert!(ctx.require_session().is_err());
    }

    #[test]
    fn test_authenticated_context() {
        let (user, session) = admin();
        let ctx = RequestContext::authenticated(user, session);
        assert!(ctx.is_authenticated());
        assert!(ctx.is_admin());
        assert_eq!(ctx.require_user().unwrap().id, "u1");
        assert_eq!(ctx.session().map(|s| s.user_id.as_str()), Some("u1"));
    }

    #[test]
    fn test_client_info_is_kept() {
        let ctx = RequestContext::anonymous().with_client(ClientInfo {
            ip_address: Some("127.0.0.1".into()),
            user_agent: None,
        });
        assert_eq!(ctx.client().ip_address.as_deref(), Some("127.0.0.1"));
        assert!(!ctx.is_authenticated());
    }
}
