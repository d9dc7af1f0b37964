//! Resilient HTTP request pipeline.
//!
//! Composable client-side transport middleware: retry with exponential
//! backoff and Retry-After support, connectivity tracking with edge-triggered
//! callbacks, and request/response logging with header redaction.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────────────┐
//!                    │                      PIPELINE                             │
//!                    │                                                           │
//!   execute(req)     │  ┌─────────┐   ┌──────────┐   ┌──────────────┐            │
//!   ─────────────────┼─▶│ logging │──▶│validation│──▶│ connectivity │            │
//!                    │  └─────────┘   └──────────┘   └──────┬───────┘            │
//!                    │                                      │                    │
//!                    │                                      ▼                    │
//!                    │                               ┌──────────────┐            │
//!                    │                               │    retry     │◀──┐ delay  │
//!                    │                               │ state machine│───┘        │
//!                    │                               └──────┬───────┘            │
//!                    │                                      │ per attempt        │
//!                    │                                      ▼                    │
//!   response | error │                               ┌──────────────┐            │
//!   ◀────────────────┼───────────────────────────────│custom units +│────────────┼──▶ Server
//!                    │                               │base transport│            │
//!                    │                               └──────────────┘            │
//!                    │                                                           │
//!                    │  ┌─────────────────────────────────────────────────────┐  │
//!                    │  │               Cross-Cutting Concerns                │  │
//!                    │  │  ┌─────────┐ ┌──────────────┐ ┌──────────────────┐  │  │
//!                    │  │  │ config  │ │ CallContext  │ │  observability   │  │  │
//!                    │  │  │ (TOML)  │ │  deadlines   │ │ tracing/metrics  │  │  │
//!                    │  │  └─────────┘ └──────────────┘ └──────────────────┘  │  │
//!                    │  └─────────────────────────────────────────────────────┘  │
//!                    └───────────────────────────────────────────────────────────┘
//! ```

// Core
pub mod client;
pub mod error;
pub mod middleware;
pub mod transport;

// Policies
pub mod health;
pub mod resilience;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use client::{Pipeline, PipelineBuilder};
pub use config::schema::PipelineConfig;
pub use error::{Error, Result};
pub use health::{ConnectivityState, DisconnectKind};
pub use middleware::{compose, middleware_fn, Chain, Middleware};
pub use resilience::RetryPolicy;
pub use transport::{BoxTransport, CallContext, HttpRequest, HttpResponse, RequestContextExt};
