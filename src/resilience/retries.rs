//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an outcome is retryable (transport errors, configured statuses)
//! - Compute the delay before the next attempt (backoff + jitter, or Retry-After)
//! - Replay the request with an identical body on every attempt
//!
//! # State Machine (per call)
//! ```text
//! Attempting(n) → Success       predicate says done
//! Attempting(n) → GivingUp      retryable but n == max_attempts, or cancelled
//! Attempting(n) → Retrying(n)   retryable, budget left, not cancelled
//! Retrying(n)   → Attempting(n+1) after the delay
//! Retrying(n)   → GivingUp      cancellation fired during the delay
//! ```
//!
//! # Design Decisions
//! - Cancellation is never retried, whatever the predicate says
//! - Server-directed delays are not capped by `max_delay`
//! - The last outcome is returned verbatim on exhaustion

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use futures_util::future::BoxFuture;
use tower::{Layer, Service, ServiceExt};

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::resilience::backoff;
use crate::transport::{rebuild_request, CallContext, HttpRequest, HttpResponse, ReplayableBody};

/// Decides whether an outcome should be retried.
pub type RetryPredicate = Arc<dyn Fn(Result<&HttpResponse, &Error>) -> bool + Send + Sync>;

/// Canonical retryable statuses.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Retry configuration shared by every call through one transport.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    jitter: Duration,
    retryable_status_codes: BTreeSet<u16>,
    respect_retry_after: bool,
    predicate: Option<RetryPredicate>,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.enabled { config.max_attempts } else { 0 },
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
            jitter: Duration::from_millis(config.jitter_ms),
            retryable_status_codes: config.retryable_status_codes.iter().copied().collect(),
            respect_retry_after: config.respect_retry_after,
            predicate: None,
        }
    }

    /// Additional attempts beyond the first.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Upper bound of the random delay added to every backoff.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Replace the default predicate.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(Result<&HttpResponse, &Error>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_delay < self.base_delay {
            return Err(Error::Config(format!(
                "max delay {:?} is below base delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "backoff factor {} must be a finite number >= 1.0",
                self.backoff_factor
            )));
        }
        if let Some(code) = self
            .retryable_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(Error::Config(format!("invalid retryable status code {code}")));
        }
        Ok(())
    }

    /// Whether `outcome` should be retried, budget aside.
    pub fn should_retry(&self, outcome: Result<&HttpResponse, &Error>) -> bool {
        if let Err(err) = outcome {
            if err.is_cancellation() {
                return false;
            }
        }
        match &self.predicate {
            Some(predicate) => predicate(outcome),
            None => match outcome {
                Ok(response) => self.is_retryable_status(response.status()),
                Err(err) => err.is_transport(),
            },
        }
    }

    /// Exponential component of the delay after attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        backoff::exponential(self.base_delay, self.backoff_factor, attempt, self.max_delay)
    }

    /// Delay before the attempt following `attempt`.
    pub fn delay_for(&self, attempt: u32, response: Option<&HttpResponse>) -> Duration {
        response
            .and_then(|response| self.server_directed_delay(response))
            .unwrap_or_else(|| self.backoff(attempt) + backoff::jitter(self.jitter))
    }

    fn server_directed_delay(&self, response: &HttpResponse) -> Option<Duration> {
        if !self.respect_retry_after {
            return None;
        }
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                retry_after(response.headers())
            }
            _ => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: Duration::from_millis(100),
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            respect_retry_after: true,
            predicate: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("jitter", &self.jitter)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("respect_retry_after", &self.respect_retry_after)
            .field("custom_predicate", &self.predicate.is_some())
            .finish()
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value)
}

/// Parse a Retry-After value: delay-seconds, or an HTTP-date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = parse_http_date(value)?;
    Some(
        date.signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

/// Obsolete HTTP-date layouts after the weekday: RFC 850, then asctime.
const OBSOLETE_DATE_FORMATS: [&str; 3] = [
    "%d-%b-%y %H:%M:%S GMT",
    "%d-%b-%Y %H:%M:%S GMT",
    "%b %e %H:%M:%S %Y",
];

/// IMF-fixdate, RFC 850 or asctime. The weekday of the obsolete forms is not checked.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    let (_weekday, rest) = value.split_once(|c: char| c == ',' || c.is_whitespace())?;
    let rest = rest.trim_start();
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(rest, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Layer that retries calls according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryLayer {
    policy: Arc<RetryPolicy>,
}

impl RetryLayer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Transport wrapper produced by [`RetryLayer`].
#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    policy: Arc<RetryPolicy>,
}

impl<S> Service<HttpRequest> for RetryService<S>
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
        Box::pin(run(self.policy.clone(), self.inner.clone(), request))
    }
}

enum State {
    Attempting { index: u32 },
    Retrying { index: u32, delay: Duration },
    Success(Result<HttpResponse>),
    GivingUp(Result<HttpResponse>),
}

async fn run<S>(policy: Arc<RetryPolicy>, inner: S, request: HttpRequest) -> Result<HttpResponse>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let context = CallContext::of(&request);
    let (parts, body) = request.into_parts();
    let body = ReplayableBody::capture(body).await?;

    let mut state = State::Attempting { index: 0 };
    loop {
        state = match state {
            State::Attempting { index } => {
                metrics::record_attempt();
                let attempt = inner.clone().oneshot(rebuild_request(&parts, body.fresh()));
                let outcome = tokio::select! {
                    biased;
                    err = context.done() => Err(err),
                    outcome = attempt => outcome,
                };

                if !policy.should_retry(outcome.as_ref()) {
                    State::Success(outcome)
                } else if index >= policy.max_attempts {
                    tracing::warn!(
                        attempts = index + 1,
                        outcome = %describe(&outcome),
                        "Retries exhausted"
                    );
                    metrics::record_exhausted();
                    State::GivingUp(outcome)
                } else if let Some(err) = context.check() {
                    State::GivingUp(Err(err))
                } else {
                    let delay = policy.delay_for(index, outcome.as_ref().ok());
                    tracing::debug!(
                        attempt = index + 1,
                        delay_ms = delay.as_millis() as u64,
                        reason = %describe(&outcome),
                        "Retrying request"
                    );
                    metrics::record_retry(&retry_reason(&outcome));
                    State::Retrying { index, delay }
                }
            }
            State::Retrying { index, delay } => {
                tokio::select! {
                    biased;
                    err = context.done() => State::GivingUp(Err(err)),
                    _ = tokio::time::sleep(delay) => State::Attempting { index: index + 1 },
                }
            }
            State::Success(outcome) | State::GivingUp(outcome) => return outcome,
        };
    }
}

fn describe(outcome: &Result<HttpResponse>) -> String {
    match outcome {
        Ok(response) => response.status().as_u16().to_string(),
        Err(err) if err.is_transport() => "transport".to_string(),
        Err(err) => err.to_string(),
    }
}

/// Bounded metric label for a retried outcome.
fn retry_reason(outcome: &Result<HttpResponse>) -> String {
    match outcome {
        Ok(response) => response.status().as_u16().to_string(),
        Err(err) if err.is_transport() => "transport".to_string(),
        Err(_) => "other".to_string(),
    }
}
