//! Pre-flight request validation.
//!
//! Callers attach a [`RequestValidator`] to a request; the unit runs it before
//! anything is sent and rejects the call with `Error::Validation` on failure.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::Request;
use futures_util::future::{self, BoxFuture, FutureExt};
use tower::{Layer, Service};

use crate::error::{Error, Result};
use crate::transport::{HttpRequest, HttpResponse};

/// Something that can check itself before being sent.
pub trait RequestValidator: Send + Sync {
    fn validate(&self) -> std::result::Result<(), String>;
}

impl<F> RequestValidator for F
where
    F: Fn() -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self) -> std::result::Result<(), String> {
        self()
    }
}

#[derive(Clone)]
struct AttachedValidator(Arc<dyn RequestValidator>);

impl fmt::Debug for AttachedValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AttachedValidator")
    }
}

/// Attach a validator to a request.
pub trait ValidatorExt {
    fn with_validator(self, validator: impl RequestValidator + 'static) -> Self;
}

impl<B> ValidatorExt for Request<B> {
    fn with_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.extensions_mut()
            .insert(AttachedValidator(Arc::new(validator)));
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationLayer;

impl ValidationLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService { inner }
    }
}

/// Transport wrapper produced by [`ValidationLayer`].
#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
}

impl<S> Service<HttpRequest> for ValidationService<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error>,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        if let Some(AttachedValidator(validator)) = request.extensions().get::<AttachedValidator>()
        {
            if let Err(message) = validator.validate() {
                tracing::debug!(
                    method = %request.method(),
                    uri = %request.uri(),
                    reason = %message,
                    "Request rejected by validator"
                );
                return future::ready(Err(Error::Validation(message))).boxed();
            }
        }
        self.inner.call(request).boxed()
    }
}
