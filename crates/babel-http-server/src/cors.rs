//! CORS (Cross-Origin Resource Sharing) support

use http::HeaderMap;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, HeaderValue, VARY,
};

use crate::{HttpServerError, Result};

/// CORS headers for a single configured origin, with credentials allowed
#[derive(Debug, Clone)]
pub struct CorsLayer {
    origin: HeaderValue,
    max_age: HeaderValue,
}

impl CorsLayer {
    pub fn new(origin: &str, max_age_secs: u64) -> Result<Self> {
        let origin = HeaderValue::from_str(origin).map_err(|_| {
            HttpServerError::InvalidConfig(format!("invalid CORS origin: {:?}", origin))
        })?;
        Ok(Self {
            origin,
            max_age: HeaderValue::from(max_age_secs),
        })
    }

    /// Apply CORS headers to a response
    pub fn apply_cors_headers(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Accept, Authorization"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_cors_headers() {
        let cors = CorsLayer::new("http://localhost:3001", 600).unwrap();
        let mut headers = HeaderMap::new();
        cors.apply_cors_headers(&mut headers);

        assert_eq!(
            headers.get("Access-Control-Allow-Origin").unwrap(),
            "http://localhost:3001"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Credentials").unwrap(),
            "true"
        );
        assert_eq!(headers.get("Access-Control-Max-Age").unwrap(), "600");
        assert!(headers.contains_key("Access-Control-Allow-Methods"));
        assert!(headers.contains_key("Access-Control-Allow-Headers"));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        assert!(matches!(
            CorsLayer::new("http://bad\norigin", 600),
            Err(HttpServerError::InvalidConfig(_))
        ));
    }
}
