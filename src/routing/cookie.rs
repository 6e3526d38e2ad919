//! `Set-Cookie` rewriting for responses relayed through the proxy.
//!
//! Cookies issued by a backend carry that backend's `Path` and `Domain`.
//! The browser only talks to the proxy, so both are pointed back at it:
//! `Path` becomes `/` and `Domain` becomes the host the client addressed.
//! Only attributes that already exist are touched; nothing is added.

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use regex::{NoExpand, Regex};

/// Rewrites `Path` and `Domain` attributes of `Set-Cookie` values.
#[derive(Debug, Clone)]
pub struct CookieRewriter {
    path_attr: Regex,
    domain_attr: Regex,
}

impl CookieRewriter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            path_attr: Regex::new(r"(?i);\s*path=[^;]*(;|$)")?,
            domain_attr: Regex::new(r"(?i);\s*domain=[^;]*(;|$)")?,
        })
    }

    /// Rewrite a single cookie string. `inbound_host` is the client's Host
    /// header; without it the Domain attribute is left alone.
    pub fn rewrite_cookie(&self, cookie: &str, inbound_host: Option<&str>) -> String {
        let rewritten = self.path_attr.replace(cookie, NoExpand("; Path=/;"));
        match inbound_host {
            Some(host) => {
                let domain = format!("; Domain={};", host_without_port(host));
                self.domain_attr
                    .replace(&rewritten, NoExpand(&domain))
                    .into_owned()
            }
            None => rewritten.into_owned(),
        }
    }

    /// Rewrite every `Set-Cookie` header in place. Values that are not
    /// valid UTF-8 are kept as they are.
    pub fn rewrite_headers(&self, headers: &mut HeaderMap, inbound_host: Option<&str>) {
        if !headers.contains_key(SET_COOKIE) {
            return;
        }

        let originals: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
        headers.remove(SET_COOKIE);

        for value in originals {
            let rewritten = value
                .to_str()
                .ok()
                .map(|cookie| self.rewrite_cookie(cookie, inbound_host))
                .and_then(|cookie| HeaderValue::from_str(&cookie).ok());
            headers.append(SET_COOKIE, rewritten.unwrap_or(value));
        }
    }
}

/// Strip the port from a Host header value, keeping IPv6 brackets.
pub fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
