//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! invariants. All violations are reported, not just the first.

use crate::config::schema::PipelineConfig;

/// A semantic problem found in a [`PipelineConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("retry.max_delay_ms ({max}) must be >= retry.base_delay_ms ({base})")]
    MaxDelayBelowBase { base: u64, max: u64 },

    #[error("retry.backoff_factor ({0}) must be a finite number >= 1.0")]
    BackoffFactor(f64),

    #[error("retry.retryable_status_codes contains invalid status {0}")]
    StatusCode(u16),

    #[error("connectivity.reconnect_delay_ms must be > 0")]
    ReconnectDelay,

    #[error("timeouts.connect_secs must be > 0")]
    ConnectTimeout,

    #[error("observability.log_level '{0}' is not a valid filter")]
    LogLevel(String),
}

/// Validate a configuration, returning every violation found.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let retry = &config.retry;

    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(ValidationError::MaxDelayBelowBase {
            base: retry.base_delay_ms,
            max: retry.max_delay_ms,
        });
    }
    if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
        errors.push(ValidationError::BackoffFactor(retry.backoff_factor));
    }
    for &status in &retry.retryable_status_codes {
        if !(100..=599).contains(&status) {
            errors.push(ValidationError::StatusCode(status));
        }
    }

    if config.connectivity.enabled && config.connectivity.reconnect_delay_ms == 0 {
        errors.push(ValidationError::ReconnectDelay);
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }

    let level = &config.observability.log_level;
    if level.parse::<tracing_subscriber::EnvFilter>().is_err() {
        errors.push(ValidationError::LogLevel(level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&PipelineConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_violation() {
        let mut config = PipelineConfig::default();
        config.retry.base_delay_ms = 500;
        config.retry.max_delay_ms = 100;
        config.retry.backoff_factor = 0.5;
        config.retry.retryable_status_codes.push(42);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MaxDelayBelowBase { base: 500, max: 100 },
                ValidationError::BackoffFactor(0.5),
                ValidationError::StatusCode(42),
            ]
        );
    }

    #[test]
    fn rejects_nan_backoff_factor() {
        let mut config = PipelineConfig::default();
        config.retry.backoff_factor = f64::NAN;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::BackoffFactor(_)));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let mut config = PipelineConfig::default();
        config.connectivity.enabled = true;
        config.connectivity.reconnect_delay_ms = 0;
        config.timeouts.connect_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ReconnectDelay));
        assert!(errors.contains(&ValidationError::ConnectTimeout));
    }

    #[test]
    fn reconnect_delay_ignored_when_tracking_disabled() {
        let mut config = PipelineConfig::default();
        config.connectivity.enabled = false;
        config.connectivity.reconnect_delay_ms = 0;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
