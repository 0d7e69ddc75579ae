use std::{collections::HashMap, net::SocketAddr};

use axum::{
    body::{to_bytes, Body, Bytes, HttpBody},
    extract::{ConnectInfo, Query, Request},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use tower_http::request_id::RequestId;
use tracing::{info, warn};

/// Bodies larger than this, or of unknown length, are forwarded untouched and
/// logged as `{}`. Same ceiling axum's `Json` extractor applies by default.
const BODY_LOG_LIMIT: u64 = 2 * 1024 * 1024;

/// Structured record emitted before the request is dispatched.
#[derive(Debug)]
pub struct RequestRecord {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub body: Value,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub host: String,
    pub protocol: String,
    pub headers: String,
    pub query: String,
    pub params: String,
    pub cookies: String,
    pub session: Option<String>,
    pub session_id: Option<String>,
    pub session_data: Option<String>,
}

/// Structured record emitted once the downstream handler has produced a
/// response.
#[derive(Debug)]
pub struct ResponseRecord {
    pub request_id: String,
    pub status: u16,
    pub method: Method,
    pub path: String,
    pub ip: String,
    pub host: String,
    pub response: Value,
}

impl RequestRecord {
    fn capture(parts: &Parts, body: &[u8]) -> Self {
        let user_agent = header_str(&parts.headers, header::USER_AGENT);
        Self {
            request_id: request_id(parts),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            body: json_map(body),
            ip: client_ip(parts),
            referer: header_str(&parts.headers, header::REFERER),
            host: host(parts),
            protocol: parts.uri.scheme_str().unwrap_or("http").to_string(),
            headers: user_agent.clone(),
            user_agent,
            query: query_value(parts, "query"),
            params: String::new(),
            cookies: cookie_value(&parts.headers, "cookies"),
            session: None,
            session_id: None,
            session_data: None,
        }
    }

    pub fn emit(&self) {
        info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            body = %self.body,
            ip = %self.ip,
            user_agent = %self.user_agent,
            referer = %self.referer,
            host = %self.host,
            protocol = %self.protocol,
            headers = %self.headers,
            query = %self.query,
            params = %self.params,
            cookies = %self.cookies,
            session = ?self.session,
            session_id = ?self.session_id,
            session_data = ?self.session_data,
            "Request"
        );
    }
}

impl ResponseRecord {
    pub fn emit(&self) {
        info!(
            request_id = %self.request_id,
            status = self.status,
            method = %self.method,
            path = %self.path,
            ip = %self.ip,
            host = %self.host,
            response = %self.response,
            "Response"
        );
    }
}

/// Log every request and its response as structured events. The request and
/// response reach their destination unchanged whatever happens to the logging.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let (body, logged) = buffer(body, "request").await;

    let request = RequestRecord::capture(&parts, &logged);
    request.emit();

    let response = next.run(Request::from_parts(parts, body)).await;

    let (parts, body) = response.into_parts();
    let (body, logged) = buffer(body, "response").await;

    ResponseRecord {
        request_id: request.request_id,
        status: parts.status.as_u16(),
        method: request.method,
        path: request.path,
        ip: request.ip,
        host: request.host,
        response: json_map(&logged),
    }
    .emit();

    Response::from_parts(parts, body)
}

/// Read a body of known, bounded length so it can be logged, and hand back an
/// equivalent body to forward. Anything else passes through unread.
async fn buffer(body: Body, side: &'static str) -> (Body, Bytes) {
    match body.size_hint().upper() {
        Some(len) if len <= BODY_LOG_LIMIT => {}
        _ => return (body, Bytes::new()),
    }

    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => (Body::from(bytes.clone()), bytes),
        Err(e) => {
            // the stream is already spent, so the peer sees the same truncated body
            warn!(error = %e, side, "failed to read body");
            (Body::empty(), Bytes::new())
        }
    }
}

/// Parse a JSON object; anything else logs as an empty mapping.
fn json_map(body: &[u8]) -> Value {
    serde_json::from_slice::<Map<String, Value>>(body)
        .map(Value::Object)
        .unwrap_or_else(|_| Value::Object(Map::new()))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn request_id(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn client_ip(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn host(parts: &Parts) -> String {
    let host = header_str(&parts.headers, header::HOST);
    if !host.is_empty() {
        return host;
    }
    parts.uri.host().unwrap_or_default().to_string()
}

fn query_value(parts: &Parts, key: &str) -> String {
    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(mut params)| params.remove(key))
        .unwrap_or_default()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> String {
    header_str(headers, header::COOKIE)
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::io;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(|Json(v): Json<Value>| async move { Json(v) }))
            .route("/fail", get(|| async { (StatusCode::BAD_REQUEST, "plain text") }))
            .route(
                "/size",
                post(|body: Body| async move {
                    let bytes = to_bytes(body, usize::MAX).await.unwrap();
                    bytes.len().to_string()
                }),
            )
            .layer(axum::middleware::from_fn(log_requests))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    fn parts(uri: &str) -> Parts {
        let (parts, _) = axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn json_map_falls_back_to_empty_object() {
        assert_eq!(json_map(b"{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(json_map(b"not json"), serde_json::json!({}));
        assert_eq!(json_map(b"[1,2]"), serde_json::json!({}));
        assert_eq!(json_map(b""), serde_json::json!({}));
    }

    #[test]
    fn query_and_cookie_lookups() {
        assert_eq!(query_value(&parts("/x?a=1&query=abc"), "query"), "abc");
        assert_eq!(query_value(&parts("/x?query=a%20b+c"), "query"), "a b c");
        assert_eq!(query_value(&parts("/x"), "query"), "");

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "x=1; cookies=yum".parse().unwrap());
        assert_eq!(cookie_value(&headers, "cookies"), "yum");
        assert_eq!(cookie_value(&HeaderMap::new(), "cookies"), "");
    }

    #[tokio::test]
    async fn body_passes_through_unchanged() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":"u1"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"username":"u1"}"#);
    }

    #[tokio::test]
    async fn oversized_body_is_forwarded_unread() {
        let payload = vec![b'a'; BODY_LOG_LIMIT as usize + 1];
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/size")
            .body(Body::from(payload.clone()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], payload.len().to_string().as_bytes());
    }

    #[tokio::test]
    async fn generated_request_id_is_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/fail")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let logs = captured.text();
        let line = logs.lines().find(|l| l.contains("Request")).unwrap();
        let id = line
            .split("request_id=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok(), "{line}");
    }

    #[tokio::test]
    async fn emits_request_and_response_records() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/fail")
            .header("x-request-id", "req-42")
            .header("user-agent", "probe/1.0")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let logs = captured.text();
        assert!(logs.contains("Request"));
        assert!(logs.contains("Response"));
        assert!(logs.contains("req-42"));
        assert!(logs.contains("probe/1.0"));
        assert!(logs.contains("status=400"));
    }
}
