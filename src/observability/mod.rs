//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every subsystem produces:
//!     → tracing events (retries, connectivity edges, probe results)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! request_log.rs (optional unit in the chain):
//!     → span with correlation id per call
//!     → request/response records with redaction and truncation
//!
//! logging.rs:
//!     → installs a subscriber for embedders that do not bring their own
//! ```
//!
//! # Design Decisions
//! - The library emits, the embedder decides where events and metrics go
//! - Logging never changes what the caller or the transport observes

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use logging::init_logging;
pub use request_log::{canonical_header_name, LoggingLayer, LoggingService, REDACTED};
