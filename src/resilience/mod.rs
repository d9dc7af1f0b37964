//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request from the outer units:
//!     → retries.rs (capture body, attempt, classify outcome)
//!     → On retryable outcome: backoff.rs (exponential delay + jitter)
//!       or the server's Retry-After directive
//!     → wait (raced against the call's CallContext), attempt again
//! ```
//!
//! # Design Decisions
//! - Per-attempt timeouts belong to the base transport; the call deadline to CallContext
//! - Attempts within one call are strictly sequential
//! - Policies are immutable and shared via Arc across concurrent calls

pub mod backoff;
pub mod retries;

pub use retries::{
    parse_retry_after, RetryLayer, RetryPolicy, RetryPredicate, RetryService,
    DEFAULT_RETRYABLE_STATUS_CODES,
};
