//! Replayable request bodies.
//!
//! The body is buffered once and every attempt gets its own fresh stream over
//! the same bytes, so consuming one attempt's body never empties the next.

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::Request;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::transport::HttpRequest;

/// A request body captured in memory for replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayableBody {
    bytes: Bytes,
}

impl ReplayableBody {
    /// Read `body` to the end.
    pub async fn capture(body: Body) -> Result<Self> {
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(Error::body)?;
        Ok(Self { bytes })
    }

    /// An independent, unread stream over the captured bytes.
    pub fn fresh(&self) -> Body {
        if self.bytes.is_empty() {
            Body::empty()
        } else {
            Body::from(self.bytes.clone())
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Bytes> for ReplayableBody {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

/// Build a new request from captured metadata and a body.
pub fn rebuild_request(parts: &Parts, body: Body) -> HttpRequest {
    let mut request = Request::new(body);
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    *request.extensions_mut() = parts.extensions.clone();
    request
}
