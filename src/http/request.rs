//! Request inspection helpers.
//!
//! # Responsibilities
//! - Resolve the client address (proxy headers, then peer address)
//! - Snapshot the request head for diagnostics, body excluded

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, Uri, Version},
};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Best-effort client address.
///
/// Checks the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// peer address recorded by `into_make_service_with_connect_info`.
/// Returns an empty string when none is available.
pub fn client_ip<B>(request: &Request<B>) -> String {
    let headers = request.headers();

    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// `User-Agent` header value, empty when absent or not visible ASCII.
pub fn user_agent<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The head of a request, captured before it is handed downstream.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestSnapshot {
    pub fn capture<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Render the request head in HTTP/1.x wire form.
    ///
    /// `Host` comes first, `Authorization` values are masked, and the body is
    /// never included.
    pub fn dump(&self) -> String {
        let target = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut out = format!("{} {} {:?}\r\n", self.method, target, self.version);

        let host = self
            .headers
            .get(header::HOST)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .or_else(|| self.uri.authority().map(|a| a.to_string()));
        if let Some(host) = host {
            out.push_str("Host: ");
            out.push_str(&host);
            out.push_str("\r\n");
        }

        for (name, value) in &self.headers {
            if *name == header::HOST {
                continue;
            }
            out.push_str(&canonical_name(name.as_str()));
            out.push_str(": ");
            if *name == header::AUTHORIZATION {
                out.push('*');
            } else {
                out.push_str(&String::from_utf8_lossy(value.as_bytes()));
            }
            out.push_str("\r\n");
        }

        out.push_str("\r\n");
        out
    }
}

/// `user-agent` → `User-Agent`.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let req = Request::builder()
            .header("X-Forwarded-For", " 203.0.113.7 , 10.0.0.1")
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_peer() {
        let req = Request::builder()
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "198.51.100.2");

        let mut req = Request::builder().body(Body::empty()).unwrap();
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_ip(&req), "192.0.2.1");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "");
    }

    #[test]
    fn dump_writes_request_line_and_headers_without_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/2?debug=1")
            .header("host", "localhost:8080")
            .header("user-agent", "curl/8.0")
            .header("authorization", "Bearer secret")
            .body(Body::from("payload"))
            .unwrap();

        let dump = RequestSnapshot::capture(&req).dump();
        assert!(dump.starts_with("POST /2?debug=1 HTTP/1.1\r\nHost: localhost:8080\r\n"));
        assert!(dump.contains("User-Agent: curl/8.0\r\n"));
        assert!(dump.contains("Authorization: *\r\n"));
        assert!(!dump.contains("secret"));
        assert!(!dump.contains("payload"));
        assert!(dump.ends_with("\r\n\r\n"));
    }

    #[test]
    fn snapshot_path_ignores_query() {
        let req = Request::builder()
            .uri("http://example.com/a/b?x=1")
            .body(Body::empty())
            .unwrap();
        let snapshot = RequestSnapshot::capture(&req);
        assert_eq!(snapshot.path(), "/a/b");
        assert!(snapshot.dump().contains("Host: example.com\r\n"));
    }

    #[test]
    fn canonical_header_names() {
        assert_eq!(canonical_name("x-forwarded-for"), "X-Forwarded-For");
        assert_eq!(canonical_name("accept"), "Accept");
    }
}
