//! Client identification from forwarded-address headers.
//!
//! Precedence: first entry of `X-Forwarded-For`, then the CDN-supplied
//! `CF-Connecting-IP`, then `X-Real-IP`. Requests carrying none of them share
//! the [`UNKNOWN_CLIENT`] bucket.

use axum::http::HeaderMap;

/// Identifier for requests without any forwarded-address header.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";

/// Derive the client identifier for a request. Never fails.
pub fn resolve_client_id(headers: &HeaderMap) -> String {
    forwarded_for(headers)
        .or_else(|| header_value(headers, CF_CONNECTING_IP))
        .or_else(|| header_value(headers, X_REAL_IP))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, X_FORWARDED_FOR)?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|first| !first.is_empty())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let h = headers(&[
            (X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1, 10.0.0.2"),
            (CF_CONNECTING_IP, "198.51.100.1"),
            (X_REAL_IP, "192.0.2.1"),
        ]);
        assert_eq!(resolve_client_id(&h), "203.0.113.7");
    }

    #[test]
    fn test_cdn_header_before_real_ip() {
        let h = headers(&[(CF_CONNECTING_IP, "198.51.100.1"), (X_REAL_IP, "192.0.2.1")]);
        assert_eq!(resolve_client_id(&h), "198.51.100.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[(X_REAL_IP, " 192.0.2.1 ")]);
        assert_eq!(resolve_client_id(&h), "192.0.2.1");
    }

    #[test]
    fn test_blank_forwarded_for_is_skipped() {
        let h = headers(&[(X_FORWARDED_FOR, " , 10.0.0.1"), (X_REAL_IP, "192.0.2.1")]);
        assert_eq!(resolve_client_id(&h), "192.0.2.1");
    }

    #[test]
    fn test_no_headers_is_unknown() {
        assert_eq!(resolve_client_id(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
