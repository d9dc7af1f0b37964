//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a request pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retry policy settings.
    pub retry: RetryConfig,

    /// Connectivity tracking settings.
    pub connectivity: ConnectivityConfig,

    /// Request/response logging settings.
    pub logging: LoggingConfig,

    /// Timeouts of the default base transport.
    pub timeouts: TimeoutConfig,

    /// Process-wide observability settings.
    pub observability: ObservabilityConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable the retry unit.
    pub enabled: bool,

    /// Additional attempts allowed after the first one.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound of the computed backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt.
    pub backoff_factor: f64,

    /// Upper bound of the random delay added to each backoff, in milliseconds.
    pub jitter_ms: u64,

    /// Status codes treated as transient.
    pub retryable_status_codes: Vec<u16>,

    /// Honor `Retry-After` on 429/503 responses.
    pub respect_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 6,
            base_delay_ms: 200,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
            jitter_ms: 100,
            retryable_status_codes: vec![408, 429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }
}

/// Connectivity tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Enable the connectivity tracker.
    pub enabled: bool,

    /// Delay between reconnect probes in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Probes issued per disconnect episode before giving up.
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect_delay_ms: 5_000,
            max_reconnect_attempts: 5,
        }
    }
}

/// Level at which the logging unit emits its records.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Request/response logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable the logging unit.
    pub enabled: bool,

    /// Level of the emitted records.
    pub level: LogLevel,

    pub log_request_headers: bool,
    pub log_response_headers: bool,
    pub log_request_body: bool,
    pub log_response_body: bool,
    pub log_timing: bool,

    /// Header names whose values are replaced before emission.
    /// Matched case-sensitively against the canonical (Title-Case) name.
    pub redacted_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: LogLevel::Info,
            log_request_headers: true,
            log_response_headers: true,
            log_request_body: true,
            log_response_body: true,
            log_timing: true,
            redacted_headers: ["Authorization", "Token", "Api-Key", "Apikey", "Secret"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Timeout configuration for the default base transport.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-attempt request timeout in seconds (0 disables it).
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 10,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit ANSI colors.
    pub ansi: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
        }
    }
}
