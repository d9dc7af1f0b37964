//! Request/response logging unit.
//!
//! # Responsibilities
//! - Emit method, target, status and timing of every call
//! - Emit headers with configured names redacted
//! - Emit bodies (pretty-printed JSON, truncated past a fixed size) and hand
//!   an equivalent fresh body to the next consumer
//!
//! # Design Decisions
//! - Redaction matches the canonical Title-Case header name exactly
//! - A body that cannot be read is reinstated as a body yielding the same error
//! - Every call runs inside a span carrying a v4 correlation id

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::HeaderMap;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream;
use tower::{Layer, Service, ServiceExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{LogLevel, LoggingConfig};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::transport::{HttpRequest, HttpResponse};

/// Bodies longer than this are truncated in the log.
pub const BODY_LOG_LIMIT: usize = 1000;

/// Placeholder emitted instead of a redacted header value.
pub const REDACTED: &str = "[REDACTED]";

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Error => tracing::error!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Trace => tracing::trace!($($arg)+),
        }
    };
}

/// Layer that logs every call passing through it.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    config: Arc<LoggingConfig>,
}

impl LoggingLayer {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Transport wrapper produced by [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
    config: Arc<LoggingConfig>,
}

impl<S> Service<HttpRequest> for LoggingService<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let inner = self.inner.clone();
        let config = self.config.clone();
        let span = tracing::info_span!(
            "pipeline_request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        );

        Box::pin(log_call(config, inner, request).instrument(span))
    }
}

async fn log_call<S>(config: Arc<LoggingConfig>, inner: S, request: HttpRequest) -> Result<HttpResponse>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let level = config.level;
    let method = request.method().clone();
    let start = Instant::now();

    log_at!(level, method = %method, uri = %request.uri(), ">> Request");
    if config.log_request_headers {
        log_headers(level, "request", request.headers(), &config.redacted_headers);
    }

    let request = if config.log_request_body {
        let (parts, body) = request.into_parts();
        let body = observe_body(level, "Request body", body).await;
        HttpRequest::from_parts(parts, body)
    } else {
        request
    };

    let outcome = inner.oneshot(request).await;
    let elapsed = start.elapsed();
    metrics::record_request_duration(
        method.as_str(),
        outcome.as_ref().ok().map(|response| response.status().as_u16()),
        start,
    );

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            log_at!(level, error = %err, elapsed = ?elapsed, "<< Error");
            return Err(err);
        }
    };

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("");
    if config.log_timing {
        log_at!(level, status = status.as_u16(), reason, elapsed = ?elapsed, "<< Response");
    } else {
        log_at!(level, status = status.as_u16(), reason, "<< Response");
    }
    if config.log_response_headers {
        log_headers(level, "response", response.headers(), &config.redacted_headers);
    }

    if config.log_response_body {
        let (parts, body) = response.into_parts();
        let body = observe_body(level, "Response body", body).await;
        return Ok(HttpResponse::from_parts(parts, body));
    }
    Ok(response)
}

/// Read `body` fully, log it, and return an equivalent unread body.
async fn observe_body(level: LogLevel, label: &'static str, body: Body) -> Body {
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            if !bytes.is_empty() {
                log_at!(level, bytes = bytes.len(), body = %format_body(&bytes), "{}", label);
            }
            Body::from(bytes)
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to read {} for logging", label.to_lowercase());
            Body::from_stream(stream::iter([Err::<Bytes, _>(err)]))
        }
    }
}

fn log_headers(level: LogLevel, direction: &'static str, headers: &HeaderMap, redacted: &[String]) {
    for name in headers.keys() {
        let canonical = canonical_header_name(name.as_str());
        let value = if redacted.iter().any(|r| *r == canonical) {
            REDACTED.to_string()
        } else {
            header_value(headers, name)
        };
        log_at!(level, direction, name = %canonical, value = %value, "Header");
    }
}

fn header_value(headers: &HeaderMap, name: &axum::http::HeaderName) -> String {
    let mut values = headers.get_all(name).iter();
    let first = values
        .next()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();
    match values.count() {
        0 => first,
        more => format!("{first} (+{more} more)"),
    }
}

/// Title-Case a header name: `x-api-key` becomes `X-Api-Key`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Render a body for the log: truncated past [`BODY_LOG_LIMIT`], pretty JSON otherwise when possible.
pub fn format_body(bytes: &[u8]) -> String {
    if bytes.len() > BODY_LOG_LIMIT {
        return format!(
            "{}... [truncated, {} bytes total]",
            String::from_utf8_lossy(&bytes[..BODY_LOG_LIMIT]),
            bytes.len()
        );
    }
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{scripted, Step};
    use crate::transport::transport_fn;
    use axum::http::{Request, Response};
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (captured, guard)
    }

    fn enabled() -> LoggingConfig {
        LoggingConfig {
            enabled: true,
            ..LoggingConfig::default()
        }
    }

    #[tokio::test]
    async fn redacted_headers_never_reach_the_log() {
        let (captured, _guard) = capture();
        let (transport, recorder) = scripted(vec![Step::Status(200)]);
        let service = LoggingLayer::new(enabled()).layer(transport);

        let request = Request::get("http://api.local/v1/spaces")
            .header("authorization", "Bearer s3cr3t-t0ken")
            .header("api-key", "key-9f8e7d")
            .header("accept", "application/json")
            .body(Body::empty())
            .unwrap();
        service.oneshot(request).await.unwrap();

        let log = captured.text();
        assert!(!log.contains("s3cr3t-t0ken"));
        assert!(!log.contains("key-9f8e7d"));
        assert!(log.contains(REDACTED));
        assert!(log.contains("application/json"));

        let seen = &recorder.calls()[0].headers;
        assert_eq!(seen["authorization"], "Bearer s3cr3t-t0ken");
        assert_eq!(seen["api-key"], "key-9f8e7d");
    }

    #[tokio::test]
    async fn redaction_is_case_sensitive() {
        let (captured, _guard) = capture();
        let (transport, _) = scripted(vec![Step::Status(200)]);
        let config = LoggingConfig {
            redacted_headers: vec!["authorization".into()],
            ..enabled()
        };
        let service = LoggingLayer::new(config).layer(transport);

        let request = Request::get("http://api.local/")
            .header("authorization", "Bearer visible")
            .body(Body::empty())
            .unwrap();
        service.oneshot(request).await.unwrap();

        assert!(captured.text().contains("Bearer visible"));
    }

    #[tokio::test]
    async fn bodies_are_logged_and_reinstated() {
        let (captured, _guard) = capture();
        let (transport, recorder) = scripted(vec![Step::Status(201)]);
        let service = LoggingLayer::new(enabled()).layer(transport);

        let request = Request::post("http://api.local/v1/objects")
            .body(Body::from(r#"{"name":"notes"}"#))
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(recorder.calls()[0].body, Bytes::from_static(br#"{"name":"notes"}"#));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"status 201"));

        let log = captured.text();
        assert!(log.contains("\"name\": \"notes\""));
        assert!(log.contains("status 201"));
        assert!(log.contains("<< Response"));
    }

    #[tokio::test]
    async fn large_bodies_are_truncated_in_the_log_only() {
        let (captured, _guard) = capture();
        let (transport, recorder) = scripted(vec![Step::Status(200)]);
        let service = LoggingLayer::new(enabled()).layer(transport);

        let payload = "a".repeat(1500);
        let request = Request::post("http://api.local/upload")
            .body(Body::from(payload.clone()))
            .unwrap();
        service.oneshot(request).await.unwrap();

        assert!(captured.text().contains("[truncated, 1500 bytes total]"));
        assert_eq!(recorder.calls()[0].body.len(), 1500);
    }

    #[tokio::test]
    async fn unreadable_body_keeps_its_error() {
        let (captured, _guard) = capture();
        let transport = transport_fn(|_request: HttpRequest| async {
            let broken = stream::iter([Err::<Bytes, _>(io::Error::other("stream broke"))]);
            let body = Body::from_stream(broken);
            Ok(Response::new(body))
        });
        let service = LoggingLayer::new(enabled()).layer(transport);

        let response = service
            .oneshot(Request::get("http://api.local/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
        assert!(captured.text().contains("Failed to read response body for logging"));
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        let (captured, _guard) = capture();
        let (transport, _) = scripted(vec![Step::Fail(io::ErrorKind::ConnectionRefused)]);
        let service = LoggingLayer::new(enabled()).layer(transport);

        let err = service
            .oneshot(Request::get("http://api.local/").body(Body::empty()).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(captured.text().contains("<< Error"));
    }

    #[test]
    fn multi_valued_headers_show_the_rest_as_a_count() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        headers.append("accept", "*/*".parse().unwrap());
        let name = axum::http::header::ACCEPT;
        assert_eq!(header_value(&headers, &name), "text/html (+2 more)");
    }

    #[test]
    fn header_names_are_title_cased() {
        assert_eq!(canonical_header_name("authorization"), "Authorization");
        assert_eq!(canonical_header_name("x-api-key"), "X-Api-Key");
        assert_eq!(canonical_header_name("apikey"), "Apikey");
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
    }

    #[test]
    fn body_formatting() {
        assert_eq!(format_body(b"plain text"), "plain text");
        assert_eq!(format_body(br#"{"a":1}"#), "{\n  \"a\": 1\n}");
        let long = vec![b'x'; BODY_LOG_LIMIT + 1];
        let formatted = format_body(&long);
        assert!(formatted.starts_with(&"x".repeat(BODY_LOG_LIMIT)));
        assert!(formatted.ends_with("... [truncated, 1001 bytes total]"));
    }
}
