//! Default base transport over a pooled hyper client.

use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tower::Service;

use crate::config::TimeoutConfig;
use crate::error::{Error, Result};
use crate::transport::{Body, HttpRequest, HttpResponse};

/// Socket-level HTTP transport with connection pooling.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Option<Duration>,
}

impl HyperTransport {
    /// Create a transport with default timeouts.
    pub fn new() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.idle_secs))
            .build(connector);

        let request_timeout =
            (config.request_secs > 0).then(|| Duration::from_secs(config.request_secs));

        Self {
            client,
            request_timeout,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<HttpRequest> for HyperTransport {
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let pending = self.client.request(request);
        let timeout = self.request_timeout;

        Box::pin(async move {
            let response = match timeout {
                Some(limit) => tokio::time::timeout(limit, pending)
                    .await
                    .map_err(Error::transport)?,
                None => pending.await,
            }
            .map_err(Error::transport)?;

            Ok(response.map(Body::new))
        })
    }
}
