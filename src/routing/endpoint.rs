//! Upstream service endpoints.

use std::fmt;

use serde::Serialize;

/// Transport used to reach an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Ws,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Ws => "ws",
        }
    }
}

/// A backend service identified by scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// `host:port`, as used in URIs and the Host header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The plain HTTP origin of this endpoint, whatever its scheme.
    pub fn http_origin(&self) -> String {
        format!("http://{}", self.authority())
    }

    /// Full URL for `path_and_query` on this endpoint.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self, path_and_query)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_urls() {
        let ws = ServiceEndpoint::new(Scheme::Ws, "localhost", 8080);
        assert_eq!(ws.to_string(), "ws://localhost:8080");
        assert_eq!(ws.http_origin(), "http://localhost:8080");
        assert_eq!(ws.url_for("/ws?token=1"), "ws://localhost:8080/ws?token=1");
        assert_eq!(ws.authority(), "localhost:8080");
    }
}
