use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// The closed set of error codes the admin API may put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    RateLimit,
    ServiceUnavailable,
    Timeout,
    Conflict,
    PreconditionFailed,
}

impl RpcErrorCode {
    pub const ALL: [RpcErrorCode; 14] = [
        RpcErrorCode::ParseError,
        RpcErrorCode::InvalidRequest,
        RpcErrorCode::MethodNotFound,
        RpcErrorCode::InvalidParams,
        RpcErrorCode::InternalError,
        RpcErrorCode::Unauthorized,
        RpcErrorCode::Forbidden,
        RpcErrorCode::NotFound,
        RpcErrorCode::ValidationError,
        RpcErrorCode::RateLimit,
        RpcErrorCode::ServiceUnavailable,
        RpcErrorCode::Timeout,
        RpcErrorCode::Conflict,
        RpcErrorCode::PreconditionFailed,
    ];

    pub fn code(&self) -> i64 {
        match self {
            RpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            RpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            RpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            RpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            RpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            RpcErrorCode::Unauthorized => error_codes::UNAUTHORIZED,
            RpcErrorCode::Forbidden => error_codes::FORBIDDEN,
            RpcErrorCode::NotFound => error_codes::NOT_FOUND,
            RpcErrorCode::ValidationError => error_codes::VALIDATION_ERROR,
            RpcErrorCode::RateLimit => error_codes::RATE_LIMIT,
            RpcErrorCode::ServiceUnavailable => error_codes::SERVICE_UNAVAILABLE,
            RpcErrorCode::Timeout => error_codes::TIMEOUT,
            RpcErrorCode::Conflict => error_codes::CONFLICT,
            RpcErrorCode::PreconditionFailed => error_codes::PRECONDITION_FAILED,
        }
    }

    /// Default human-readable message for the code
    pub fn message(&self) -> &'static str {
        match self {
            RpcErrorCode::ParseError => "Parse error",
            RpcErrorCode::InvalidRequest => "Invalid Request",
            RpcErrorCode::MethodNotFound => "Method not found",
            RpcErrorCode::InvalidParams => "Invalid params",
            RpcErrorCode::InternalError => "Internal error",
            RpcErrorCode::Unauthorized => "Unauthorized",
            RpcErrorCode::Forbidden => "Forbidden",
            RpcErrorCode::NotFound => "Resource not found",
            RpcErrorCode::ValidationError => "Validation error",
            RpcErrorCode::RateLimit => "Rate limit exceeded",
            RpcErrorCode::ServiceUnavailable => "Service unavailable",
            RpcErrorCode::Timeout => "Operation timed out",
            RpcErrorCode::Conflict => "Conflict",
            RpcErrorCode::PreconditionFailed => "Precondition failed",
        }
    }

    /// Standard JSON-RPC 2.0 codes, as opposed to the application range
    pub fn is_standard(&self) -> bool {
        matches!(
            self,
            RpcErrorCode::ParseError
                | RpcErrorCode::InvalidRequest
                | RpcErrorCode::MethodNotFound
                | RpcErrorCode::InvalidParams
                | RpcErrorCode::InternalError
        )
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// A taxonomy error: the wire-level `error` object of a failed response.
///
/// `data` is omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    /// The taxonomy entry for this error, if the code belongs to it
    pub fn kind(&self) -> Option<RpcErrorCode> {
        RpcErrorCode::from_code(self.code)
    }

    pub fn is(&self, code: RpcErrorCode) -> bool {
        self.code == code.code()
    }

    /// Replace the message, keeping code and data
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(RpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(RpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            RpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            Some(json!({ "method": method })),
        )
    }

    pub fn invalid_params(details: Option<Value>) -> Self {
        Self::new(RpcErrorCode::InvalidParams, None, details)
    }

    /// Wrap an arbitrary failure, keeping its message as `data`
    pub fn internal_error(error: impl fmt::Display) -> Self {
        Self::new(
            RpcErrorCode::InternalError,
            None,
            Some(Value::String(error.to_string())),
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(RpcErrorCode::Unauthorized, None, None)
    }

    pub fn forbidden() -> Self {
        Self::new(RpcErrorCode::Forbidden, None, None)
    }

    pub fn not_found(resource: Option<&str>) -> Self {
        Self::new(
            RpcErrorCode::NotFound,
            Some(format!("{} not found", resource.unwrap_or("Resource"))),
            None,
        )
    }

    pub fn validation_error(errors: Value) -> Self {
        Self::new(RpcErrorCode::ValidationError, None, Some(errors))
    }

    pub fn rate_limit(retry_after: Option<u64>) -> Self {
        Self::new(
            RpcErrorCode::RateLimit,
            None,
            retry_after.map(|seconds| json!({ "retryAfter": seconds })),
        )
    }

    pub fn service_unavailable(service: Option<&str>) -> Self {
        let message = match service {
            Some(service) => format!("Service {} unavailable", service),
            None => RpcErrorCode::ServiceUnavailable.message().to_string(),
        };
        Self::new(RpcErrorCode::ServiceUnavailable, Some(message), None)
    }

    pub fn timeout(operation: Option<&str>) -> Self {
        let message = match operation {
            Some(operation) => format!("Operation {} timed out", operation),
            None => RpcErrorCode::Timeout.message().to_string(),
        };
        Self::new(RpcErrorCode::Timeout, Some(message), None)
    }

    pub fn conflict(details: Option<Value>) -> Self {
        Self::new(RpcErrorCode::Conflict, None, details)
    }

    pub fn precondition_failed(details: Option<Value>) -> Self {
        Self::new(RpcErrorCode::PreconditionFailed, None, details)
    }
}

/// Failure returned by a method handler.
///
/// Taxonomy errors pass through the registry untouched; anything else is
/// converted to an `internalError` at the registry boundary.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn unexpected<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Unexpected(anyhow::Error::new(error))
    }

    pub fn into_rpc_error(self) -> RpcError {
        match self {
            HandlerError::Rpc(error) => error,
            HandlerError::Unexpected(error) => RpcError::internal_error(error),
        }
    }
}

/// JSON-RPC error response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: RpcError,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, RpcError::parse_error(None))
    }

    pub fn invalid_request(id: Option<RequestId>, reason: &str) -> Self {
        Self::new(
            id,
            RpcError::invalid_request(Some(Value::String(reason.to_string()))),
        )
    }

    pub fn method_not_found(id: Option<RequestId>, method: &str) -> Self {
        Self::new(id, RpcError::method_not_found(method))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RpcErrorCode::ParseError.code(), -32700);
        assert_eq!(RpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(RpcErrorCode::Unauthorized.code(), -32001);
        assert_eq!(RpcErrorCode::PreconditionFailed.code(), -32009);
    }

    #[test]
    fn test_codes_are_unique_and_reversible() {
        for code in RpcErrorCode::ALL {
            assert_eq!(RpcErrorCode::from_code(code.code()), Some(code));
            assert!(code.code() < 0);
        }
        assert_eq!(RpcErrorCode::from_code(-1), None);
    }

    #[test]
    fn test_standard_partition() {
        let standard: Vec<_> = RpcErrorCode::ALL
            .into_iter()
            .filter(RpcErrorCode::is_standard)
            .collect();
        assert_eq!(standard.len(), 5);
        for code in RpcErrorCode::ALL.into_iter().filter(|c| !c.is_standard()) {
            assert!((error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END)
                .contains(&code.code()));
        }
    }

    #[test]
    fn test_data_omitted_when_absent() {
        let json = serde_json::to_value(RpcError::unauthorized()).unwrap();
        assert_eq!(json, json!({"code": -32001, "message": "Unauthorized"}));
    }

    #[test]
    fn test_method_not_found_carries_method() {
        let error = RpcError::method_not_found("nonexistent.method");
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method 'nonexistent.method' not found");
        assert_eq!(error.data, Some(json!({"method": "nonexistent.method"})));
    }

    #[test]
    fn test_factory_messages() {
        assert_eq!(RpcError::not_found(Some("User")).message, "User not found");
        assert_eq!(RpcError::not_found(None).message, "Resource not found");
        assert_eq!(
            RpcError::service_unavailable(Some("storage")).message,
            "Service storage unavailable"
        );
        assert_eq!(
            RpcError::timeout(Some("user.list")).message,
            "Operation user.list timed out"
        );
        assert_eq!(
            RpcError::rate_limit(Some(30)).data,
            Some(json!({"retryAfter": 30}))
        );
        assert_eq!(RpcError::rate_limit(None).data, None);
        assert_eq!(
            RpcError::forbidden().with_message("Admin access required").message,
            "Admin access required"
        );
    }

    #[test]
    fn test_unexpected_handler_error_becomes_internal() {
        let error = HandlerError::from(anyhow::anyhow!("database exploded")).into_rpc_error();
        assert!(error.is(RpcErrorCode::InternalError));
        assert_eq!(error.message, "Internal error");
        assert_eq!(error.data, Some(json!("database exploded")));
    }

    #[test]
    fn test_taxonomy_handler_error_passes_through() {
        let original = RpcError::conflict(Some(json!({"field": "email"})));
        let error = HandlerError::from(original.clone()).into_rpc_error();
        assert_eq!(error, original);
    }

    #[test]
    fn test_error_envelope_serialization() {
        let error = JsonRpcError::method_not_found(Some(RequestId::from(3)), "test");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 3);
        assert_eq!(json["error"]["code"], -32601);

        let parse = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert!(parse["id"].is_null());
        assert!(parse["error"].get("data").is_none());
    }
}
