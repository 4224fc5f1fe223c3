use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters as submitted by the caller
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Handlers only ever see positional parameters. Objects contribute
    /// their values in key insertion order.
    pub fn into_positional(self) -> Vec<Value> {
        match self {
            RequestParams::Array(values) => values,
            RequestParams::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// A validated request with params already normalized to positional form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            method: method.into(),
            params,
        }
    }

    /// Create a new request with no parameters
    pub fn new_no_params(id: Option<RequestId>, method: impl Into<String>) -> Self {
        Self::new(id, method, Vec::new())
    }

    /// Parse a raw body into a normalized request.
    ///
    /// Malformed JSON is a parse error with a `null` id. Every other
    /// violation is an invalid request that echoes the id when one can be
    /// recovered from the payload.
    pub fn parse(body: &[u8]) -> Result<Self, JsonRpcError> {
        let value: Value = serde_json::from_slice(body).map_err(|err| {
            debug!("Rejecting unparseable body: {}", err);
            JsonRpcError::parse_error()
        })?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value as a request envelope
    pub fn from_value(value: Value) -> Result<Self, JsonRpcError> {
        let Value::Object(mut obj) = value else {
            return Err(JsonRpcError::invalid_request(
                None,
                "Request must be a JSON object",
            ));
        };

        let id = obj.get("id").and_then(RequestId::from_value);

        match obj.get("jsonrpc") {
            Some(Value::String(version)) if version == crate::JSONRPC_VERSION => {}
            _ => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    "jsonrpc must be exactly \"2.0\"",
                ));
            }
        }

        let method = match obj.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => return Err(JsonRpcError::invalid_request(id, "Method is required")),
        };

        let params = match obj.remove("params") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => RequestParams::Array(values).into_positional(),
            Some(Value::Object(map)) => RequestParams::Object(map).into_positional(),
            Some(_) => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    "params must be an array or an object",
                ));
            }
        };

        Ok(Self::new(id, method, params))
    }

    /// Get a parameter by position
    pub fn get_param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_codes;
    use serde_json::json;

    fn parse(body: &str) -> Result<JsonRpcRequest, JsonRpcError> {
        JsonRpcRequest::parse(body.as_bytes())
    }

    #[test]
    fn test_parse_valid_request() {
        let request = parse(r#"{"jsonrpc": "2.0", "method": "system.health", "id": 1}"#).unwrap();

        assert_eq!(request.method, "system.health");
        assert_eq!(request.id, Some(RequestId::from(1)));
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_fractional_and_large_ids_are_kept() {
        let request = parse(r#"{"jsonrpc":"2.0","method":"m","id":1.5}"#).unwrap();
        assert_eq!(serde_json::to_value(&request.id).unwrap(), json!(1.5));

        let request = parse(r#"{"jsonrpc":"2.0","method":"m","id":18446744073709551615}"#).unwrap();
        assert_eq!(serde_json::to_value(&request.id).unwrap(), json!(u64::MAX));

        let error = parse(r#"{"jsonrpc":"1.0","method":"m","id":1.5}"#).unwrap_err();
        assert_eq!(serde_json::to_value(&error.id).unwrap(), json!(1.5));
    }

    #[test]
    fn test_object_params_follow_insertion_order() {
        let request =
            parse(r#"{"jsonrpc":"2.0","method":"m","params":{"b":2,"a":1,"c":3},"id":"x"}"#)
                .unwrap();
        assert_eq!(request.params, vec![json!(2), json!(1), json!(3)]);

        let request = parse(r#"{"jsonrpc":"2.0","method":"m","params":{"a":1,"b":2}}"#).unwrap();
        assert_eq!(request.params, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_array_and_null_params() {
        let request =
            parse(r#"{"jsonrpc":"2.0","method":"m","params":["x",{"k":true}],"id":2}"#).unwrap();
        assert_eq!(request.get_param(0), Some(&json!("x")));
        assert_eq!(request.get_param(1), Some(&json!({"k": true})));
        assert_eq!(request.get_param(2), None);

        let request = parse(r#"{"jsonrpc":"2.0","method":"m","params":null,"id":2}"#).unwrap();
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let error = parse(r#"{"jsonrpc": "2.0", "method": "test""#).unwrap_err();
        assert_eq!(error.error.code, error_codes::PARSE_ERROR);
        assert_eq!(error.id, None);
    }

    #[test]
    fn test_wrong_version_echoes_id() {
        let error = parse(r#"{"jsonrpc": "1.0", "method": "test", "id": 9}"#).unwrap_err();
        assert_eq!(error.error.code, error_codes::INVALID_REQUEST);
        assert_eq!(error.id, Some(RequestId::from(9)));

        let error = parse(r#"{"method": "test", "id": {"bad": true}}"#).unwrap_err();
        assert_eq!(error.error.code, error_codes::INVALID_REQUEST);
        assert_eq!(error.id, None);
    }

    #[test]
    fn test_missing_or_empty_method() {
        for body in [
            r#"{"jsonrpc": "2.0", "id": 4}"#,
            r#"{"jsonrpc": "2.0", "method": "", "id": 4}"#,
            r#"{"jsonrpc": "2.0", "method": 12, "id": 4}"#,
        ] {
            let error = parse(body).unwrap_err();
            assert_eq!(error.error.code, error_codes::INVALID_REQUEST);
            assert_eq!(error.id, Some(RequestId::from(4)));
        }
    }

    #[test]
    fn test_non_object_body_and_scalar_params() {
        let error = parse(r#"[{"jsonrpc":"2.0","method":"m","id":1}]"#).unwrap_err();
        assert_eq!(error.error.code, error_codes::INVALID_REQUEST);

        let error = parse(r#"{"jsonrpc":"2.0","method":"m","params":5,"id":1}"#).unwrap_err();
        assert_eq!(error.error.code, error_codes::INVALID_REQUEST);
        assert_eq!(error.id, Some(RequestId::from(1)));
    }
}
