//! Header hygiene for forwarded messages.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Build the upstream path-and-query
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Headers listed in `Connection` are hop-by-hop too
//! - An upgrade request forwarded over plain HTTP loses its upgrade headers

use axum::http::header::{
    CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName};

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Remove headers that only apply to a single transport hop.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        CONNECTION,
        KEEP_ALIVE,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Append the original query string, if any, to the outbound path.
pub fn outbound_path_and_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn strips_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade, x-internal"));
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert("x-internal", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("cookie", HeaderValue::from_static("a=b"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("cookie").unwrap(), "a=b");
    }

    #[test]
    fn keeps_query_string() {
        assert_eq!(outbound_path_and_query("/api/aws", Some("region=eu")), "/api/aws?region=eu");
        assert_eq!(outbound_path_and_query("/login", None), "/login");
    }
}
