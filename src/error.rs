//! Error types shared by every pipeline unit.
//!
//! # Taxonomy
//! - `Transport`: the base transport could not complete the round trip
//!   (connect, DNS, socket timeout, reset). Eligible for retry.
//! - `Cancelled` / `DeadlineExceeded`: the call's own cancellation signal
//!   fired. Never retried, always propagated immediately.
//! - `Body`: a request or response body stream failed while being read.
//! - `Validation`: a request was rejected before it was sent.
//! - `Config`: the pipeline was assembled from invalid settings.
//!
//! Retryable and terminal statuses are not errors: they arrive as ordinary
//! responses and the retry engine decides what to do with them.

use crate::health::passive::{classify_disconnect, classify_message, DisconnectKind};

/// Boxed error used for foreign error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by transports and middleware units.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying call could not complete.
    #[error("transport error: {source}")]
    Transport {
        /// Disconnect category derived from the source, if any.
        kind: Option<DisconnectKind>,
        #[source]
        source: BoxError,
    },

    /// The call's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The call's deadline passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// A body stream failed while being read.
    #[error("body error: {0}")]
    Body(#[source] BoxError),

    /// The request was rejected by a validator before being sent.
    #[error("request validation failed: {0}")]
    Validation(String),

    /// The pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a failure of the underlying transport, classifying it on the way.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        let kind = classify_disconnect(&*source);
        Error::Transport { kind, source }
    }

    /// Wrap a body read failure.
    pub fn body(source: impl Into<BoxError>) -> Self {
        Error::Body(source.into())
    }

    /// True for failures of the underlying transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// True when the call's own cancellation signal ended it.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// The disconnect category of this error, if it signals lost connectivity.
    pub fn disconnect_kind(&self) -> Option<DisconnectKind> {
        match self {
            Error::Transport { kind, source } => {
                kind.or_else(|| classify_message(&source.to_string()))
            }
            Error::Body(source) => classify_disconnect(&**source),
            _ => None,
        }
    }
}
