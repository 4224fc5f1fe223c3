//! HTTP status codes for failed calls

use babel_json_rpc::{RpcError, RpcErrorCode};
use http::StatusCode;

/// Status for an error response; codes outside the mapping are a 500
pub fn http_status(error: &RpcError) -> StatusCode {
    match error.kind() {
        Some(RpcErrorCode::ParseError)
        | Some(RpcErrorCode::InvalidRequest)
        | Some(RpcErrorCode::InvalidParams) => StatusCode::BAD_REQUEST,
        Some(RpcErrorCode::MethodNotFound) | Some(RpcErrorCode::NotFound) => StatusCode::NOT_FOUND,
        Some(RpcErrorCode::Unauthorized) => StatusCode::UNAUTHORIZED,
        Some(RpcErrorCode::Forbidden) => StatusCode::FORBIDDEN,
        Some(RpcErrorCode::ValidationError) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(RpcErrorCode::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
        Some(RpcErrorCode::ServiceUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        Some(RpcErrorCode::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        Some(RpcErrorCode::Conflict) => StatusCode::CONFLICT,
        Some(RpcErrorCode::InternalError)
        | Some(RpcErrorCode::PreconditionFailed)
        | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RpcError::parse_error(None), 400),
            (RpcError::invalid_request(None), 400),
            (RpcError::invalid_params(None), 400),
            (RpcError::method_not_found("x"), 404),
            (RpcError::not_found(Some("User")), 404),
            (RpcError::unauthorized(), 401),
            (RpcError::forbidden(), 403),
            (RpcError::validation_error(serde_json::json!({})), 422),
            (RpcError::rate_limit(None), 429),
            (RpcError::service_unavailable(None), 503),
            (RpcError::timeout(None), 504),
            (RpcError::conflict(None), 409),
            (RpcError::internal_error("x"), 500),
            (RpcError::precondition_failed(None), 500),
        ];
        for (error, status) in cases {
            assert_eq!(http_status(&error).as_u16(), status, "{}", error);
        }
    }

    #[test]
    fn test_unknown_code_is_server_error() {
        let error = RpcError {
            code: -1,
            message: "custom".into(),
            data: None,
        };
        assert_eq!(http_status(&error), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
