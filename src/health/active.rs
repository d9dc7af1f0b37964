//! Active reconnect probing.
//!
//! # Responsibilities
//! - While disconnected, periodically probe a known URI through the base transport
//! - Flip the shared state back to connected on the first probe that gets a response
//! - Bound the number of probes per disconnect episode
//!
//! The probe never touches the middleware chain, so it is not retried or logged
//! as a regular call.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Uri};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::config::ConnectivityConfig;
use crate::health::state::ConnectivityState;
use crate::transport::BoxTransport;

/// Background task that restores connectivity after an outage.
pub struct ReconnectProbe {
    state: Arc<ConnectivityState>,
    transport: BoxTransport,
    uri: Uri,
    interval: Duration,
    max_attempts: u32,
}

impl ReconnectProbe {
    pub fn new(
        state: Arc<ConnectivityState>,
        transport: BoxTransport,
        uri: Uri,
        config: &ConnectivityConfig,
    ) -> Self {
        Self {
            state,
            transport,
            uri,
            interval: Duration::from_millis(config.reconnect_delay_ms.max(1)),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            uri = %self.uri,
            "Reconnect probe starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut attempts = 0u32;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state.is_connected() {
                        attempts = 0;
                        continue;
                    }
                    if attempts >= self.max_attempts {
                        continue;
                    }
                    attempts += 1;
                    if self.probe(attempts).await {
                        attempts = 0;
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Reconnect probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn probe(&self, attempt: u32) -> bool {
        let request = match Request::get(self.uri.clone())
            .header(header::USER_AGENT, "request-pipeline-probe")
            .body(Body::empty())
        {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Failed to build probe request: {}", e);
                return false;
            }
        };

        match self.transport.clone().oneshot(request).await {
            Ok(response) => {
                tracing::debug!(attempt, status = %response.status(), "Probe reached the server");
                self.state.mark_reconnected();
                true
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %e,
                    "Probe failed"
                );
                false
            }
        }
    }
}
