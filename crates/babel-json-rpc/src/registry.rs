//! Method registry: name to handler plus access metadata.
//!
//! A registry is built mutably during bootstrap and then shared behind an
//! `Arc`; every query and [`MethodRegistry::invoke`] take `&self`, so the
//! request path never locks.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::context::RequestContext;
use crate::error::{HandlerError, RpcError};
use crate::handler::RpcHandler;

/// Access and documentation metadata attached to a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    pub description: String,
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub deprecated: bool,
    pub version: String,
}

impl Default for MethodMetadata {
    /// Uncatalogued methods are private until stated otherwise
    fn default() -> Self {
        Self {
            description: String::new(),
            requires_auth: true,
            requires_admin: false,
            deprecated: false,
            version: "1.0.0".to_string(),
        }
    }
}

impl MethodMetadata {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self.requires_admin = false;
        self
    }

    pub fn admin(mut self) -> Self {
        self.requires_auth = true;
        self.requires_admin = true;
        self
    }
}

/// Partial metadata supplied at registration, merged over the catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverride {
    pub description: Option<String>,
    pub requires_auth: Option<bool>,
    pub requires_admin: Option<bool>,
    pub deprecated: Option<bool>,
    pub version: Option<String>,
}

impl MetadataOverride {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = Some(requires_auth);
        self
    }

    pub fn requires_admin(mut self, requires_admin: bool) -> Self {
        self.requires_admin = Some(requires_admin);
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Merge onto `base`. Admin methods always require authentication.
    pub fn apply(self, mut base: MethodMetadata) -> MethodMetadata {
        if let Some(description) = self.description {
            base.description = description;
        }
        if let Some(requires_auth) = self.requires_auth {
            base.requires_auth = requires_auth;
        }
        if let Some(requires_admin) = self.requires_admin {
            base.requires_admin = requires_admin;
        }
        if let Some(deprecated) = self.deprecated {
            base.deprecated = deprecated;
        }
        if let Some(version) = self.version {
            base.version = version;
        }
        if base.requires_admin {
            base.requires_auth = true;
        }
        base
    }
}

/// Identity reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            protocol: "JSON-RPC 2.0".to_string(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new("Babel Panel API", "1.0.0")
    }
}

/// One method as listed by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub method: String,
    #[serde(flatten)]
    pub metadata: MethodMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStatistics {
    pub total: usize,
    pub public: usize,
    pub authenticated: usize,
    pub admin: usize,
}

/// Snapshot returned by `GET /json-rpc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryInfo {
    pub jsonrpc: String,
    pub methods: Vec<String>,
    pub metadata: BTreeMap<String, MethodDescriptor>,
    pub statistics: MethodStatistics,
    pub server: ServerInfo,
}

struct MethodEntry {
    handler: Arc<dyn RpcHandler>,
    metadata: MethodMetadata,
}

pub struct MethodRegistry {
    methods: HashMap<String, MethodEntry>,
    catalog: HashMap<String, MethodMetadata>,
    public_methods: HashSet<String>,
    admin_methods: HashSet<String>,
    server: ServerInfo,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new(ServerInfo::default())
    }
}

impl MethodRegistry {
    pub fn new(server: ServerInfo) -> Self {
        Self::with_catalog(server, std::iter::empty::<(String, MethodMetadata)>())
    }

    /// Create a registry whose registrations default to the given metadata
    pub fn with_catalog<I, S>(server: ServerInfo, catalog: I) -> Self
    where
        I: IntoIterator<Item = (S, MethodMetadata)>,
        S: Into<String>,
    {
        Self {
            methods: HashMap::new(),
            catalog: catalog
                .into_iter()
                .map(|(name, metadata)| (name.into(), metadata))
                .collect(),
            public_methods: HashSet::new(),
            admin_methods: HashSet::new(),
            server,
        }
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: RpcHandler + 'static,
    {
        self.register_with_metadata(name, handler, MetadataOverride::default());
    }

    /// Register a handler, replacing any previous entry under the same name
    pub fn register_with_metadata<H>(
        &mut self,
        name: impl Into<String>,
        handler: H,
        metadata: MetadataOverride,
    ) where
        H: RpcHandler + 'static,
    {
        let name = name.into();
        let base = self.catalog.get(&name).cloned().unwrap_or_default();
        let metadata = metadata.apply(base);

        if self.methods.contains_key(&name) {
            warn!("Method {} already registered, overwriting", name);
        }

        if metadata.requires_auth {
            self.public_methods.remove(&name);
        } else {
            self.public_methods.insert(name.clone());
        }
        if metadata.requires_admin {
            self.admin_methods.insert(name.clone());
        } else {
            self.admin_methods.remove(&name);
        }

        debug!(
            method = %name,
            requires_auth = metadata.requires_auth,
            requires_admin = metadata.requires_admin,
            "Registered RPC method"
        );
        self.methods.insert(
            name,
            MethodEntry {
                handler: Arc::new(handler),
                metadata,
            },
        );
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_metadata(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.get(name).map(|entry| &entry.metadata)
    }

    /// Whether a session is needed. Unknown methods need none, so they
    /// fall through to `methodNotFound`.
    pub fn requires_auth(&self, name: &str) -> bool {
        self.methods.contains_key(name) && !self.public_methods.contains(name)
    }

    pub fn requires_admin(&self, name: &str) -> bool {
        self.admin_methods.contains(name)
    }

    /// Registered method names, sorted
    pub fn all_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    /// Enforce access rules and run the handler.
    ///
    /// Taxonomy errors from the handler are returned unchanged; any other
    /// failure, panics included, becomes `internalError`.
    pub async fn invoke(
        &self,
        name: &str,
        params: Vec<Value>,
        context: &RequestContext,
    ) -> Result<Value, RpcError> {
        let Some(entry) = self.methods.get(name) else {
            return Err(RpcError::method_not_found(name));
        };

        if self.requires_auth(name) && context.session().is_none() {
            return Err(RpcError::unauthorized());
        }
        if self.requires_admin(name) && !context.is_admin() {
            return Err(RpcError::forbidden().with_message("Admin access required"));
        }

        debug!(method = name, params = params.len(), "Invoking RPC method");

        let outcome = AssertUnwindSafe(entry.handler.invoke(params, context))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(HandlerError::Rpc(err))) => {
                debug!(method = name, code = err.code, "RPC method returned error: {}", err);
                Err(err)
            }
            Ok(Err(HandlerError::Unexpected(err))) => {
                error!(method = name, "RPC method failed: {:#}", err);
                Err(RpcError::internal_error(err))
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                error!(method = name, "RPC method panicked: {}", message);
                Err(RpcError::internal_error(message))
            }
        }
    }

    /// Introspection snapshot, rebuilt on every call
    pub fn discovery_info(&self) -> DiscoveryInfo {
        let methods = self.all_methods();
        let public = methods
            .iter()
            .filter(|m| !self.requires_auth(m))
            .count();
        let admin = methods.iter().filter(|m| self.requires_admin(m)).count();

        let metadata = self
            .methods
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    MethodDescriptor {
                        method: name.clone(),
                        metadata: entry.metadata.clone(),
                    },
                )
            })
            .collect();

        DiscoveryInfo {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            statistics: MethodStatistics {
                total: methods.len(),
                public,
                authenticated: methods.len() - public,
                admin,
            },
            methods,
            metadata,
            server: self.server.clone(),
        }
    }

    /// Drop every registration; the catalog is kept
    pub fn clear(&mut self) {
        self.methods.clear();
        self.public_methods.clear();
        self.admin_methods.clear();
        info!("RPC registry cleared");
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.all_methods())
            .field("server", &self.server)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AuthSession, AuthUser};
    use crate::error::RpcErrorCode;
    use crate::handler::handler_fn;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn context_with_role(role: &str) -> RequestContext {
        RequestContext::authenticated(
            AuthUser {
                id: "u1".into(),
                email: "user@babel.local".into(),
                name: Some("User".into()),
                role: role.into(),
            },
            AuthSession {
                id: "s1".into(),
                token: "token".into(),
                user_id: "u1".into(),
                expires_at: Utc::now() + Duration::hours(1),
            },
        )
    }

    fn echo() -> impl RpcHandler {
        handler_fn(|params: Vec<Value>, _ctx| async move { Ok(Value::Array(params)) })
    }

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::with_catalog(
            ServerInfo::default(),
            [
                ("system.health", MethodMetadata::new("Health check").public()),
                ("auth.getMe", MethodMetadata::new("Current user")),
                ("user.list", MethodMetadata::new("List users").admin()),
            ],
        );
        registry.register("system.health", echo());
        registry.register("auth.getMe", echo());
        registry.register("user.list", echo());
        registry
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let registry = registry();
        assert!(!registry.requires_auth("nonexistent.method"));

        let err = registry
            .invoke("nonexistent.method", vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::MethodNotFound));
        assert_eq!(err.data, Some(json!({"method": "nonexistent.method"})));
    }

    #[tokio::test]
    async fn test_public_method_needs_no_session() {
        let registry = registry();
        let result = registry
            .invoke("system.health", vec![json!(1)], &RequestContext::anonymous())
            .await
            .unwrap();
        assert_eq!(result, json!([1]));
    }

    #[tokio::test]
    async fn test_auth_and_admin_enforcement() {
        let registry = registry();

        let err = registry
            .invoke("auth.getMe", vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"code": -32001, "message": "Unauthorized"}));

        let err = registry
            .invoke("user.list", vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::Unauthorized));

        let err = registry
            .invoke("user.list", vec![], &context_with_role("user"))
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::Forbidden));
        assert_eq!(err.message, "Admin access required");

        assert!(registry
            .invoke("user.list", vec![], &context_with_role("admin"))
            .await
            .is_ok());
        assert!(registry
            .invoke("auth.getMe", vec![], &context_with_role("user"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_handler_value_returned_unchanged() {
        let mut registry = MethodRegistry::default();
        let value = json!({"nested": {"list": [1, "two", null]}, "flag": false});
        let expected = value.clone();
        registry.register_with_metadata(
            "test.value",
            handler_fn(move |_params, _ctx| {
                let value = value.clone();
                async move { Ok(value) }
            }),
            MetadataOverride::default().requires_auth(false),
        );

        let result = registry
            .invoke("test.value", vec![], &RequestContext::anonymous())
            .await
            .unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_unexpected_errors_become_internal() {
        let mut registry = MethodRegistry::default();
        registry.register_with_metadata(
            "test.fail",
            handler_fn(|_params, _ctx| async move {
                Err::<Value, HandlerError>(anyhow::anyhow!("disk full").into())
            }),
            MetadataOverride::default().requires_auth(false),
        );
        registry.register_with_metadata(
            "test.panic",
            handler_fn(|params: Vec<Value>, _ctx| async move {
                if params.is_empty() {
                    panic!("boom");
                }
                Ok(Value::Null)
            }),
            MetadataOverride::default().requires_auth(false),
        );

        let err = registry
            .invoke("test.fail", vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::InternalError));
        assert_eq!(err.data, Some(json!("disk full")));

        let err = registry
            .invoke("test.panic", vec![], &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(err.is(RpcErrorCode::InternalError));
        assert_eq!(err.data, Some(json!("boom")));
    }

    #[test]
    fn test_uncatalogued_methods_require_auth() {
        let mut registry = MethodRegistry::default();
        registry.register("custom.thing", echo());
        let metadata = registry.method_metadata("custom.thing").unwrap();
        assert!(metadata.requires_auth);
        assert!(!metadata.requires_admin);
        assert_eq!(metadata.version, "1.0.0");
        assert!(registry.requires_auth("custom.thing"));
    }

    #[test]
    fn test_override_merges_over_catalog() {
        let mut registry = registry();
        registry.register_with_metadata(
            "auth.getMe",
            echo(),
            MetadataOverride::default().deprecated(true).requires_admin(true),
        );
        let metadata = registry.method_metadata("auth.getMe").unwrap();
        assert_eq!(metadata.description, "Current user");
        assert!(metadata.deprecated);
        assert!(metadata.requires_auth);
        assert!(registry.requires_admin("auth.getMe"));

        registry.register_with_metadata(
            "auth.getMe",
            echo(),
            MetadataOverride::default().requires_auth(false),
        );
        assert!(!registry.requires_auth("auth.getMe"));
        assert!(!registry.requires_admin("auth.getMe"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_reregistration_overwrites_with_warning() {
        let mut registry = registry();
        registry.register(
            "system.health",
            handler_fn(|_params, _ctx| async { Ok(json!("replaced")) }),
        );

        assert_eq!(registry.len(), 3);
        assert!(!registry.requires_auth("system.health"));
        assert!(logs_contain("Method system.health already registered, overwriting"));
    }

    #[test]
    fn test_discovery_info() {
        let registry = registry();
        let first = registry.discovery_info();
        let second = registry.discovery_info();
        assert_eq!(first, second);

        assert_eq!(first.methods, vec!["auth.getMe", "system.health", "user.list"]);
        assert_eq!(
            first.statistics,
            MethodStatistics {
                total: 3,
                public: 1,
                authenticated: 2,
                admin: 1
            }
        );
        assert_eq!(first.server.name, "Babel Panel API");

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["metadata"]["user.list"]["requiresAdmin"], true);
        assert_eq!(json["metadata"]["user.list"]["method"], "user.list");
        assert_eq!(json["server"]["protocol"], "JSON-RPC 2.0");
    }

    #[test]
    fn test_clear() {
        let mut registry = registry();
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.has_method("system.health"));
        assert_eq!(registry.discovery_info().statistics.total, 0);
    }
}
