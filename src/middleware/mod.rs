//! Middleware units.
//!
//! # Data Flow
//! ```text
//! Chain::new(base).with(a).with(b).build()
//!     → a.wrap(b.wrap(base))
//!     → request seen by a, then b, then base
//! ```
//!
//! # Design Decisions
//! - A unit is anything that turns one transport into another (`Middleware::wrap`)
//! - Every `tower::Layer<BoxTransport>` is a unit, so resilience, health and
//!   observability layers plug in unchanged
//! - Closures are adapted with [`middleware_fn`]

pub mod chain;
pub mod validation;

use tower::layer::{layer_fn, LayerFn};
use tower::{Layer, Service};

use crate::error::Error;
use crate::transport::{boxed, BoxTransport, HttpRequest, HttpResponse};

pub use chain::{compose, Chain};
pub use validation::{RequestValidator, ValidationLayer, ValidationService, ValidatorExt};

/// Wraps a transport in added behavior.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxTransport) -> BoxTransport;
}

impl<L> Middleware for L
where
    L: Layer<BoxTransport> + Send + Sync,
    L::Service: Service<HttpRequest, Response = HttpResponse, Error = Error>
        + Clone
        + Send
        + Sync
        + 'static,
    <L::Service as Service<HttpRequest>>::Future: Send + 'static,
{
    fn wrap(&self, next: BoxTransport) -> BoxTransport {
        boxed(self.layer(next))
    }
}

/// Adapt a closure into a middleware unit.
pub fn middleware_fn<F>(f: F) -> LayerFn<F>
where
    F: Fn(BoxTransport) -> BoxTransport + Send + Sync,
{
    layer_fn(f)
}
