//! Pipeline facade.
//!
//! # Responsibilities
//! - Assemble the conventional chain around a base transport
//! - Offer the single `execute` capability to collaborators
//! - Own the connectivity state and the optional reconnect probe
//!
//! # Chain Order
//! ```text
//! Logging → Validation → Connectivity → Retry → custom units → base transport
//! ```
//! Connectivity sees the outcome of a whole call, after retries. Custom units
//! sit innermost and therefore run once per attempt.

use std::fmt;
use std::sync::Arc;

use axum::http::Uri;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

use crate::config::{
    validate_config, ConfigError, ConnectivityConfig, LoggingConfig, PipelineConfig,
    ValidationError,
};
use crate::error::{Error, Result};
use crate::health::{ConnectivityCallback, ConnectivityLayer, ConnectivityState, ReconnectProbe};
use crate::middleware::{Chain, Middleware, ValidationLayer};
use crate::observability::LoggingLayer;
use crate::resilience::{RetryLayer, RetryPolicy};
use crate::transport::{boxed, BoxTransport, HttpRequest, HttpResponse, HyperTransport};

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    base: Option<BoxTransport>,
    retry: Option<RetryPolicy>,
    connectivity: Option<ConnectivityConfig>,
    on_disconnect: Option<ConnectivityCallback>,
    on_reconnect: Option<ConnectivityCallback>,
    logging: Option<LoggingConfig>,
    validation: bool,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder over [`HyperTransport`] with every section of `config` applied.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        validate_config(config)
            .map_err(|errors| Error::Config(ConfigError::Validation(errors).to_string()))?;

        let mut builder = Self::new()
            .transport(HyperTransport::from_config(&config.timeouts))
            .validation(true);
        if config.retry.enabled {
            builder = builder.retry(RetryPolicy::from_config(&config.retry));
        }
        if config.connectivity.enabled {
            builder = builder.track_connectivity(config.connectivity.clone());
        }
        if config.logging.enabled {
            builder = builder.logging(config.logging.clone());
        }
        Ok(builder)
    }

    /// Base transport every unit wraps.
    pub fn transport<S>(mut self, transport: S) -> Self
    where
        S: Service<HttpRequest, Response = HttpResponse, Error = Error>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.base = Some(boxed(transport));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn track_connectivity(mut self, config: ConnectivityConfig) -> Self {
        self.connectivity = Some(config);
        self
    }

    /// Fired once per connected → disconnected edge. Enables tracking.
    pub fn on_disconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(callback));
        self.connectivity.get_or_insert_with(ConnectivityConfig::default);
        self
    }

    /// Fired once per disconnected → connected edge. Enables tracking.
    pub fn on_reconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnect = Some(Arc::new(callback));
        self.connectivity.get_or_insert_with(ConnectivityConfig::default);
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Add a custom unit inside the built-in ones.
    pub fn middleware(mut self, unit: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(unit));
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let base = self
            .base
            .ok_or_else(|| Error::Config("no base transport configured".into()))?;
        if let Some(config) = &self.connectivity {
            if config.reconnect_delay_ms == 0 {
                return Err(Error::Config(ValidationError::ReconnectDelay.to_string()));
            }
        }

        let state = self.connectivity.as_ref().map(|_| {
            let mut state = ConnectivityState::new();
            if let Some(callback) = self.on_disconnect.clone() {
                state = state.with_on_disconnect(move || callback());
            }
            if let Some(callback) = self.on_reconnect.clone() {
                state = state.with_on_reconnect(move || callback());
            }
            Arc::new(state)
        });

        let mut chain = Chain::new(base.clone());
        if let Some(config) = self.logging {
            chain = chain.with(LoggingLayer::new(config));
        }
        if self.validation {
            chain = chain.with(ValidationLayer::new());
        }
        if let Some(state) = &state {
            chain = chain.with(ConnectivityLayer::new(state.clone()));
        }
        if let Some(policy) = self.retry {
            policy.validate()?;
            chain = chain.with(RetryLayer::new(policy));
        }
        for unit in self.middleware {
            chain = chain.with_shared(unit);
        }

        Ok(Pipeline {
            transport: chain.build()?,
            base,
            state,
            connectivity: self.connectivity.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("has_base", &self.base.is_some())
            .field("retry", &self.retry)
            .field("connectivity", &self.connectivity)
            .field("logging", &self.logging.is_some())
            .field("validation", &self.validation)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// A composed transport with its connectivity state.
#[derive(Clone)]
pub struct Pipeline {
    transport: BoxTransport,
    base: BoxTransport,
    state: Option<Arc<ConnectivityState>>,
    connectivity: ConnectivityConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Send `request` through the chain.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.clone().oneshot(request).await
    }

    /// Connected unless tracking is enabled and the last classified outcome was a disconnect.
    pub fn is_connected(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.is_connected())
    }

    pub fn connectivity(&self) -> Option<&Arc<ConnectivityState>> {
        self.state.as_ref()
    }

    /// The composed transport, for collaborators that want a `tower::Service`.
    pub fn transport(&self) -> BoxTransport {
        self.transport.clone()
    }

    /// Start probing `uri` while disconnected. `None` when tracking is off.
    pub fn spawn_reconnect_probe(
        &self,
        uri: Uri,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let state = self.state.clone()?;
        let probe = ReconnectProbe::new(state, self.base.clone(), uri, &self.connectivity);
        Some(tokio::spawn(probe.run(shutdown)))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("connected", &self.is_connected())
            .field("tracking", &self.state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{middleware_fn, ValidatorExt};
    use crate::transport::testing::{get, scripted, Step};
    use crate::transport::transport_fn;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(100))
            .with_jitter(Duration::ZERO)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn build_without_transport_fails_fast() {
        let err = Pipeline::builder().retry(fast_retry(1)).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_policy_fails_at_build() {
        let (transport, _) = scripted(vec![Step::Status(200)]);
        let err = Pipeline::builder()
            .transport(transport)
            .retry(fast_retry(1).with_backoff_factor(0.1))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn recovered_retries_are_not_disconnects() {
        let (downs, on_down) = counter();
        let (transport, recorder) = scripted(vec![
            Step::Fail(io::ErrorKind::ConnectionRefused),
            Step::Fail(io::ErrorKind::ConnectionRefused),
            Step::Status(200),
        ]);
        let pipeline = Pipeline::builder()
            .transport(transport)
            .retry(fast_retry(3))
            .on_disconnect(on_down)
            .build()
            .unwrap();

        let response = pipeline.execute(get("http://api.local/")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(recorder.count(), 3);
        assert_eq!(downs.load(Ordering::SeqCst), 0);
        assert!(pipeline.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_disconnect_then_recovery_fires_both_edges() {
        let (downs, on_down) = counter();
        let (ups, on_up) = counter();
        let (transport, _) = scripted(vec![
            Step::Fail(io::ErrorKind::ConnectionRefused),
            Step::Fail(io::ErrorKind::ConnectionRefused),
            Step::Status(200),
        ]);
        let pipeline = Pipeline::builder()
            .transport(transport)
            .retry(fast_retry(1))
            .on_disconnect(on_down)
            .on_reconnect(on_up)
            .build()
            .unwrap();

        let err = pipeline.execute(get("http://api.local/")).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!pipeline.is_connected());
        assert_eq!(downs.load(Ordering::SeqCst), 1);

        pipeline.execute(get("http://api.local/")).await.unwrap();
        assert!(pipeline.is_connected());
        assert_eq!(ups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_units_run_once_per_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let unit = middleware_fn(move |next: BoxTransport| {
            let seen = seen.clone();
            transport_fn(move |request: HttpRequest| {
                seen.fetch_add(1, Ordering::SeqCst);
                next.clone().oneshot(request)
            })
        });

        let (transport, _) = scripted(vec![Step::Status(503), Step::Status(200)]);
        let pipeline = Pipeline::builder()
            .transport(transport)
            .retry(fast_retry(2))
            .middleware(unit)
            .build()
            .unwrap();

        pipeline.execute(get("http://api.local/")).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_failures_are_not_retried_or_tracked() {
        let (downs, on_down) = counter();
        let (transport, recorder) = scripted(vec![Step::Status(200)]);
        let pipeline = Pipeline::builder()
            .transport(transport)
            .retry(fast_retry(3))
            .validation(true)
            .on_disconnect(on_down)
            .build()
            .unwrap();

        let request = get("http://api.local/")
            .with_validator(|| -> std::result::Result<(), String> { Err("missing id".into()) });
        let err = pipeline.execute(request).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(recorder.count(), 0);
        assert_eq!(downs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn untracked_pipeline_has_no_probe() {
        let (transport, _) = scripted(vec![Step::Status(200)]);
        let pipeline = Pipeline::builder().transport(transport).build().unwrap();
        assert!(pipeline.is_connected());
        assert!(pipeline.connectivity().is_none());
        assert!(pipeline
            .spawn_reconnect_probe(Uri::from_static("http://api.local/"), CancellationToken::new())
            .is_none());
    }

    #[tokio::test]
    async fn from_config_applies_enabled_sections() {
        let mut config = PipelineConfig::default();
        config.logging.enabled = true;
        let pipeline = PipelineBuilder::from_config(&config).unwrap().build().unwrap();
        assert!(pipeline.connectivity().is_some());

        config.retry.max_delay_ms = 1;
        assert!(matches!(
            PipelineBuilder::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_reconnect_delay_is_rejected() {
        let (transport, _) = scripted(vec![Step::Status(200)]);
        let err = Pipeline::builder()
            .transport(transport)
            .track_connectivity(ConnectivityConfig {
                enabled: true,
                reconnect_delay_ms: 0,
                max_reconnect_attempts: 3,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(message) if message.contains("reconnect_delay_ms")));
    }
}
