//! Passive connectivity tracking.
//!
//! # Responsibilities
//! - Observe the outcome of every call passing through the chain
//! - Classify transport failures as disconnect signals
//! - Drive the edge-triggered [`ConnectivityState`]
//!
//! # Design Decisions
//! - Pure observer: the outcome is forwarded unchanged, never retried or suppressed
//! - Structured classification (io kinds, hyper/tokio timeouts) before message matching
//! - Any returned response counts as proof of connectivity, whatever its status

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service, ServiceExt};

use crate::error::{Error, Result};
use crate::health::state::ConnectivityState;
use crate::transport::{HttpRequest, HttpResponse};

/// Failure categories that signal lost connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectKind {
    ConnectionRefused,
    HostUnreachable,
    NameResolution,
    Timeout,
    ConnectionReset,
}

impl fmt::Display for DisconnectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisconnectKind::ConnectionRefused => "connection_refused",
            DisconnectKind::HostUnreachable => "host_unreachable",
            DisconnectKind::NameResolution => "name_resolution",
            DisconnectKind::Timeout => "timeout",
            DisconnectKind::ConnectionReset => "connection_reset",
        })
    }
}

const MESSAGE_PATTERNS: &[(&str, DisconnectKind)] = &[
    ("connection refused", DisconnectKind::ConnectionRefused),
    ("no such host", DisconnectKind::NameResolution),
    ("dns error", DisconnectKind::NameResolution),
    ("failed to lookup address", DisconnectKind::NameResolution),
    ("name or service not known", DisconnectKind::NameResolution),
    ("name resolution", DisconnectKind::NameResolution),
    ("host unreachable", DisconnectKind::HostUnreachable),
    ("no route to host", DisconnectKind::HostUnreachable),
    ("network is unreachable", DisconnectKind::HostUnreachable),
    ("i/o timeout", DisconnectKind::Timeout),
    ("timed out", DisconnectKind::Timeout),
    ("deadline has elapsed", DisconnectKind::Timeout),
    ("connection reset", DisconnectKind::ConnectionReset),
    ("connection aborted", DisconnectKind::ConnectionReset),
];

/// Classify an error by walking its source chain.
///
/// Structured categories win; each link's message is matched only when no
/// link carries one.
pub fn classify_disconnect(err: &(dyn StdError + 'static)) -> Option<DisconnectKind> {
    let chain = || std::iter::successors(Some(err), |&e| e.source());

    chain()
        .find_map(classify_structured)
        .or_else(|| chain().find_map(|e| classify_message(&e.to_string())))
}

fn classify_structured(err: &(dyn StdError + 'static)) -> Option<DisconnectKind> {
    if let Some(io) = err.downcast_ref::<io::Error>() {
        return classify_io_kind(io.kind());
    }
    if err.is::<tokio::time::error::Elapsed>() {
        return Some(DisconnectKind::Timeout);
    }
    if let Some(hyper) = err.downcast_ref::<hyper::Error>() {
        if hyper.is_timeout() {
            return Some(DisconnectKind::Timeout);
        }
    }
    None
}

fn classify_io_kind(kind: io::ErrorKind) -> Option<DisconnectKind> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some(DisconnectKind::ConnectionRefused),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
            Some(DisconnectKind::ConnectionReset)
        }
        io::ErrorKind::TimedOut => Some(DisconnectKind::Timeout),
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            Some(DisconnectKind::HostUnreachable)
        }
        _ => None,
    }
}

/// Classify an error from its textual description alone.
pub fn classify_message(message: &str) -> Option<DisconnectKind> {
    let message = message.to_lowercase();
    MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| message.contains(pattern))
        .map(|&(_, kind)| kind)
}

/// Layer that tracks connectivity in a shared [`ConnectivityState`].
#[derive(Debug, Clone)]
pub struct ConnectivityLayer {
    state: Arc<ConnectivityState>,
}

impl ConnectivityLayer {
    pub fn new(state: Arc<ConnectivityState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ConnectivityState> {
        &self.state
    }
}

impl<S> Layer<S> for ConnectivityLayer {
    type Service = ConnectivityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConnectivityService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Transport wrapper produced by [`ConnectivityLayer`].
#[derive(Debug, Clone)]
pub struct ConnectivityService<S> {
    inner: S,
    state: Arc<ConnectivityState>,
}

impl<S> Service<HttpRequest> for ConnectivityService<S>
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
        let state = self.state.clone();

        Box::pin(async move {
            let outcome = inner.oneshot(request).await;
            match &outcome {
                Ok(_) => {
                    state.mark_reconnected();
                }
                Err(err) => {
                    if let Some(kind) = err.disconnect_kind() {
                        state.mark_disconnected(kind);
                    }
                }
            }
            outcome
        })
    }
}
