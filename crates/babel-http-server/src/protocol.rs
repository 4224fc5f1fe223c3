//! Credential and client detail extraction from HTTP request headers

use babel_json_rpc::ClientInfo;
use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE, USER_AGENT};

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "babel.session_token";

/// Extract the token of an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Extract the session token from the `Cookie` header(s)
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Bearer token first, then the session cookie
pub fn extract_credentials(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_session_cookie(headers))
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// First hop of `X-Forwarded-For`, falling back to `X-Real-IP`
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("X-Real-IP").and_then(|h| h.to_str().ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: extract_client_ip(headers),
        user_agent: extract_user_agent(headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            extract_bearer_token(&headers(&[("authorization", "Bearer abc123")])),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers(&[("authorization", "bearer  xyz ")])),
            Some("xyz".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers(&[("authorization", "Basic dXNlcjpwYXNz")])),
            None
        );
        assert_eq!(extract_bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie() {
        let map = headers(&[
            ("cookie", "theme=dark"),
            ("cookie", "lang=en; babel.session_token=tok42; other=1"),
        ]);
        assert_eq!(extract_session_cookie(&map), Some("tok42".to_string()));
        assert_eq!(
            extract_session_cookie(&headers(&[("cookie", "babel.session_token=")])),
            None
        );
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "babel.session_token=from-cookie"),
        ]);
        assert_eq!(extract_credentials(&map), Some("from-header".to_string()));

        let map = headers(&[("cookie", "babel.session_token=from-cookie")]);
        assert_eq!(extract_credentials(&map), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_client_details() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("user-agent", "curl/8.0"),
        ]);
        let client = extract_client_info(&map);
        assert_eq!(client.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(client.user_agent.as_deref(), Some("curl/8.0"));

        let map = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(extract_client_ip(&map), Some("198.51.100.2".to_string()));
    }
}
