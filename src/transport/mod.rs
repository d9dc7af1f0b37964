//! Transport abstraction.
//!
//! # Data Flow
//! ```text
//! collaborator
//!     → HttpRequest (method, target, headers, body, CallContext extension)
//!     → BoxTransport (composed middleware chain)
//!     → base transport (hyper_client.rs, or any Service)
//!     → HttpResponse | Error
//! ```
//!
//! # Design Decisions
//! - A transport is any `tower::Service` from `HttpRequest` to `HttpResponse`
//! - The erased form is `Clone + Send + Sync` so one instance serves concurrent calls
//! - Bodies are replayed from memory (body.rs); cancellation rides in extensions (context.rs)

pub mod body;
pub mod context;
pub mod hyper_client;

use std::future::Future;

use axum::http::{Request, Response};
use tower::util::BoxCloneSyncService;
use tower::Service;

use crate::error::Error;

pub use axum::body::Body;
pub use body::{rebuild_request, ReplayableBody};
pub use context::{CallContext, RequestContextExt};
pub use hyper_client::HyperTransport;

/// Outgoing request type.
pub type HttpRequest = Request<Body>;

/// Incoming response type.
pub type HttpResponse = Response<Body>;

/// Type-erased transport shared by every middleware unit.
pub type BoxTransport = BoxCloneSyncService<HttpRequest, HttpResponse, Error>;

/// Erase a concrete transport.
pub fn boxed<S>(transport: S) -> BoxTransport
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(transport)
}

/// Build a transport from an async closure.
pub fn transport_fn<F, Fut>(f: F) -> BoxTransport
where
    F: Fn(HttpRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    boxed(tower::service_fn(f))
}
